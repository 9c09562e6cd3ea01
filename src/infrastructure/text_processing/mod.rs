mod recursive_text_splitter;

pub use recursive_text_splitter::RecursiveTextSplitter;
