//! Traversal strategies, filters and the visitor state machine

pub mod api;
pub mod comparators;
pub mod filters;
pub mod traversal;
pub mod visitor;


pub use api::ApiTraversal;
pub use filters::{
    from_fn, AcceptAll, EmitFilter, FnFilter, ItemFilter, ItemFilterExt, NotHiddenFilter, PackageFilter,
    SurfaceFilter,
};
pub use traversal::{BaseTraversal, ClassMembers, ClassSelection, Traversal, TraversalConfig};
pub use visitor::{walk, walk_class, ItemVisitor};
