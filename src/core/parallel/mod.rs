pub mod buffered_update;
pub mod element;
pub mod task_list;

pub use buffered_update::{BufferedUpdateConfig, ConcurrentBufferedUpdate, PassReport};
pub use element::{BufferedElement, ElementId};
pub use task_list::{chunk_size, TaskList, WorkItem, BASE_CHUNK_SIZE};
