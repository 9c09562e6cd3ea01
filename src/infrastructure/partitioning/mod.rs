mod mock_partitioner;
mod unstructured_client;

pub use mock_partitioner::MockPartitioner;
pub use unstructured_client::{UnstructuredClient, form_fields, parse_elements};
