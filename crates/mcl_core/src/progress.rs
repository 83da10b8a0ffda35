/// A progress snapshot, sent through an `mpsc` channel at most once per
/// task transition.
#[derive(Debug, Clone)]
pub struct GenericProgress {
    pub done: usize,
    pub total: usize,
    pub message: Option<String>,
    pub has_finished: bool,
}

impl Default for GenericProgress {
    fn default() -> Self {
        Self {
            done: 0,
            total: 1,
            message: None,
            has_finished: false,
        }
    }
}

impl GenericProgress {
    #[must_use]
    pub fn finished() -> Self {
        Self {
            done: 1,
            total: 1,
            message: None,
            has_finished: true,
        }
    }
}
