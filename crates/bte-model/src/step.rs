/// When [`crate::BehaviorTreeModel::update`] steps an auto-stepping tree.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum StepStrategy {
    /// One step per update.
    #[default]
    EveryUpdate,
    /// One step once at least `seconds` have accumulated. Backlog beyond one interval is
    /// dropped.
    Interval { seconds: f32 },
}

#[derive(Debug, Clone, Default)]
pub(crate) struct StepClock {
    strategy: StepStrategy,
    accumulated: f32,
}

impl StepClock {
    pub(crate) fn new(strategy: StepStrategy) -> Self {
        Self {
            strategy,
            accumulated: 0.0,
        }
    }

    pub(crate) fn strategy(&self) -> StepStrategy {
        self.strategy
    }

    /// Advance by `dt_seconds`; true when a step is due.
    pub(crate) fn advance(&mut self, dt_seconds: f32) -> bool {
        match self.strategy {
            StepStrategy::EveryUpdate => true,
            StepStrategy::Interval { seconds } => {
                self.accumulated += dt_seconds.max(0.0);
                if self.accumulated < seconds {
                    return false;
                }
                self.accumulated -= seconds;
                if self.accumulated >= seconds {
                    self.accumulated = 0.0;
                }
                true
            }
        }
    }

    pub(crate) fn reset(&mut self) {
        self.accumulated = 0.0;
    }
}
