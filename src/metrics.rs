//! Per-operation metrics reported by the store client.

/// Timing and capacity figures for one store call, or a sum over several.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OperationMetrics {
    pub duration_ms: f64,
    pub consumed_rcu: Option<f64>,
    pub consumed_wcu: Option<f64>,
    pub items_count: Option<usize>,
}

impl OperationMetrics {
    pub fn new(duration_ms: f64) -> Self {
        Self {
            duration_ms,
            ..Self::default()
        }
    }

    pub fn with_capacity(
        duration_ms: f64,
        consumed_rcu: Option<f64>,
        consumed_wcu: Option<f64>,
        items_count: Option<usize>,
    ) -> Self {
        Self {
            duration_ms,
            consumed_rcu,
            consumed_wcu,
            items_count,
        }
    }

    /// Fold another call's figures into this one.
    pub fn accumulate(&mut self, other: &OperationMetrics) {
        fn add<T: std::ops::Add<Output = T> + Copy>(a: Option<T>, b: Option<T>) -> Option<T> {
            match (a, b) {
                (Some(x), Some(y)) => Some(x + y),
                (x, None) => x,
                (None, y) => y,
            }
        }
        self.duration_ms += other.duration_ms;
        self.consumed_rcu = add(self.consumed_rcu, other.consumed_rcu);
        self.consumed_wcu = add(self.consumed_wcu, other.consumed_wcu);
        self.items_count = add(self.items_count, other.items_count);
    }
}
