pub mod post;
pub mod topic;

pub use post::Model as Post;
pub use topic::Model as Topic;
