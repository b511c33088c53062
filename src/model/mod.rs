pub mod project;
pub mod task;
pub mod timeline;
pub mod tree;

pub use project::Project;
pub use task::{Dependency, DependencyKind, ProjectId, Task, TaskId, TaskRecord};
pub use timeline::{Granularity, TimeAxis};
pub use tree::TaskTree;
