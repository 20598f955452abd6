mod serpapi;

pub use serpapi::SerpApiSearcher;
