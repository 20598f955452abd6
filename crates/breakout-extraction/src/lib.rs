mod groq;

pub use groq::GroqExtractor;
