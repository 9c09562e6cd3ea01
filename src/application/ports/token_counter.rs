/// Length estimator used for chunk budgeting.
pub trait TokenCounter: Send + Sync {
    fn count(&self, text: &str) -> usize;
}
