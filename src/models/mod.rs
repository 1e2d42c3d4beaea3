pub mod post;

pub use post::{
    Account, Attachment, CategoryScore, MediaKind, Post, ScoreBreakdown, ScoredPost,
};
