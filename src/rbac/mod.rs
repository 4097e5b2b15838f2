/// Role-based access control
mod evaluator;

pub use evaluator::PermissionEvaluator;
