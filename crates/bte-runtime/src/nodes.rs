use crate::rng::DeterministicRng;
use crate::{Blackboard, NodeId, StepContext, StepError, Task, TaskStatus};

/// Shared body of the memory composites: resume at the running child, stop at the first child
/// whose status equals `stop_on`.
struct Memory {
    children: Vec<Box<dyn Task>>,
    order: Vec<usize>,
    index: usize,
}

impl Memory {
    fn new(children: Vec<Box<dyn Task>>) -> Self {
        Self {
            children,
            order: Vec::new(),
            index: 0,
        }
    }

    fn child_at(&self, position: usize) -> usize {
        self.order.get(position).copied().unwrap_or(position)
    }

    fn run(
        &mut self,
        ctx: &mut StepContext<'_>,
        stop_on: TaskStatus,
    ) -> Result<TaskStatus, StepError> {
        while self.index < self.children.len() {
            let child = self.child_at(self.index);
            let status = self.children[child].tick(ctx)?;
            if status == TaskStatus::Running {
                return Ok(TaskStatus::Running);
            }
            if status == stop_on {
                self.reset();
                return Ok(stop_on);
            }
            self.index += 1;
        }

        self.reset();
        Ok(match stop_on {
            TaskStatus::Failure => TaskStatus::Success,
            _ => TaskStatus::Failure,
        })
    }

    fn cancel(&mut self, ctx: &mut StepContext<'_>) {
        if self.index < self.children.len() {
            let child = self.child_at(self.index);
            self.children[child].cancel(ctx);
        }
        self.reset();
    }

    fn reset(&mut self) {
        self.index = 0;
        self.order.clear();
        for c in self.children.iter_mut() {
            c.reset();
        }
    }
}

/// Runs children in order until one fails. Resumes a running child on the next step.
pub struct Sequence {
    body: Memory,
}

impl Sequence {
    pub fn new(children: Vec<Box<dyn Task>>) -> Self {
        Self {
            body: Memory::new(children),
        }
    }
}

impl Task for Sequence {
    fn tick(&mut self, ctx: &mut StepContext<'_>) -> Result<TaskStatus, StepError> {
        self.body.run(ctx, TaskStatus::Failure)
    }

    fn cancel(&mut self, ctx: &mut StepContext<'_>) {
        self.body.cancel(ctx);
    }

    fn reset(&mut self) {
        self.body.reset();
    }
}

/// Runs children in order until one succeeds. Resumes a running child on the next step.
pub struct Selector {
    body: Memory,
}

impl Selector {
    pub fn new(children: Vec<Box<dyn Task>>) -> Self {
        Self {
            body: Memory::new(children),
        }
    }
}

impl Task for Selector {
    fn tick(&mut self, ctx: &mut StepContext<'_>) -> Result<TaskStatus, StepError> {
        self.body.run(ctx, TaskStatus::Success)
    }

    fn cancel(&mut self, ctx: &mut StepContext<'_>) {
        self.body.cancel(ctx);
    }

    fn reset(&mut self) {
        self.body.reset();
    }
}

fn shuffle_on_start(body: &mut Memory, ctx: &StepContext<'_>, node: NodeId) {
    if body.index == 0 && body.order.is_empty() {
        body.order = (0..body.children.len()).collect();
        ctx.rng_for(node).shuffle(&mut body.order);
    }
}

/// [`Sequence`] over a shuffled child order, drawn once per run.
pub struct RandomSequence {
    node: NodeId,
    body: Memory,
}

impl RandomSequence {
    pub fn new(node: NodeId, children: Vec<Box<dyn Task>>) -> Self {
        Self {
            node,
            body: Memory::new(children),
        }
    }
}

impl Task for RandomSequence {
    fn tick(&mut self, ctx: &mut StepContext<'_>) -> Result<TaskStatus, StepError> {
        shuffle_on_start(&mut self.body, ctx, self.node);
        self.body.run(ctx, TaskStatus::Failure)
    }

    fn cancel(&mut self, ctx: &mut StepContext<'_>) {
        self.body.cancel(ctx);
    }

    fn reset(&mut self) {
        self.body.reset();
    }
}

/// [`Selector`] over a shuffled child order, drawn once per run.
pub struct RandomSelector {
    node: NodeId,
    body: Memory,
}

impl RandomSelector {
    pub fn new(node: NodeId, children: Vec<Box<dyn Task>>) -> Self {
        Self {
            node,
            body: Memory::new(children),
        }
    }
}

impl Task for RandomSelector {
    fn tick(&mut self, ctx: &mut StepContext<'_>) -> Result<TaskStatus, StepError> {
        shuffle_on_start(&mut self.body, ctx, self.node);
        self.body.run(ctx, TaskStatus::Success)
    }

    fn cancel(&mut self, ctx: &mut StepContext<'_>) {
        self.body.cancel(ctx);
    }

    fn reset(&mut self) {
        self.body.reset();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParallelPolicy {
    /// Fails as soon as one child fails, succeeds once all succeeded.
    Sequence,
    /// Succeeds as soon as one child succeeds, fails once all failed.
    Selector,
}

/// Ticks every unfinished child each step. When the policy settles, children still running
/// are cancelled.
pub struct Parallel {
    policy: ParallelPolicy,
    children: Vec<Box<dyn Task>>,
    finished: Vec<Option<TaskStatus>>,
}

impl Parallel {
    pub fn new(policy: ParallelPolicy, children: Vec<Box<dyn Task>>) -> Self {
        let finished = vec![None; children.len()];
        Self {
            policy,
            children,
            finished,
        }
    }

    fn settled(&self) -> Option<TaskStatus> {
        let total = self.children.len();
        let successes = self
            .finished
            .iter()
            .filter(|s| **s == Some(TaskStatus::Success))
            .count();
        let failures = self
            .finished
            .iter()
            .filter(|s| **s == Some(TaskStatus::Failure))
            .count();
        match self.policy {
            ParallelPolicy::Sequence if failures > 0 => Some(TaskStatus::Failure),
            ParallelPolicy::Sequence if successes == total => Some(TaskStatus::Success),
            ParallelPolicy::Selector if successes > 0 => Some(TaskStatus::Success),
            ParallelPolicy::Selector if failures == total => Some(TaskStatus::Failure),
            _ => None,
        }
    }
}

impl Task for Parallel {
    fn tick(&mut self, ctx: &mut StepContext<'_>) -> Result<TaskStatus, StepError> {
        if let Some(outcome) = self.settled() {
            // Only reachable without children.
            self.reset();
            return Ok(outcome);
        }

        for i in 0..self.children.len() {
            if self.finished[i].is_some() {
                continue;
            }
            let status = self.children[i].tick(ctx)?;
            if status != TaskStatus::Running {
                self.finished[i] = Some(status);
            }
            if let Some(outcome) = self.settled() {
                self.cancel(ctx);
                return Ok(outcome);
            }
        }

        Ok(TaskStatus::Running)
    }

    fn cancel(&mut self, ctx: &mut StepContext<'_>) {
        for (child, finished) in self.children.iter_mut().zip(self.finished.iter()) {
            if finished.is_none() {
                child.cancel(ctx);
            }
        }
        self.reset();
    }

    fn reset(&mut self) {
        for f in self.finished.iter_mut() {
            *f = None;
        }
        for c in self.children.iter_mut() {
            c.reset();
        }
    }
}

/// Swaps `Success` and `Failure` of its child.
pub struct Invert {
    child: Box<dyn Task>,
}

impl Invert {
    pub fn new(child: Box<dyn Task>) -> Self {
        Self { child }
    }
}

impl Task for Invert {
    fn tick(&mut self, ctx: &mut StepContext<'_>) -> Result<TaskStatus, StepError> {
        Ok(match self.child.tick(ctx)? {
            TaskStatus::Running => TaskStatus::Running,
            TaskStatus::Success => TaskStatus::Failure,
            _ => TaskStatus::Success,
        })
    }

    fn cancel(&mut self, ctx: &mut StepContext<'_>) {
        self.child.cancel(ctx);
    }

    fn reset(&mut self) {
        self.child.reset();
    }
}

pub struct AlwaysSucceed {
    child: Box<dyn Task>,
}

impl AlwaysSucceed {
    pub fn new(child: Box<dyn Task>) -> Self {
        Self { child }
    }
}

impl Task for AlwaysSucceed {
    fn tick(&mut self, ctx: &mut StepContext<'_>) -> Result<TaskStatus, StepError> {
        Ok(match self.child.tick(ctx)? {
            TaskStatus::Running => TaskStatus::Running,
            _ => TaskStatus::Success,
        })
    }

    fn cancel(&mut self, ctx: &mut StepContext<'_>) {
        self.child.cancel(ctx);
    }

    fn reset(&mut self) {
        self.child.reset();
    }
}

pub struct AlwaysFail {
    child: Box<dyn Task>,
}

impl AlwaysFail {
    pub fn new(child: Box<dyn Task>) -> Self {
        Self { child }
    }
}

impl Task for AlwaysFail {
    fn tick(&mut self, ctx: &mut StepContext<'_>) -> Result<TaskStatus, StepError> {
        Ok(match self.child.tick(ctx)? {
            TaskStatus::Running => TaskStatus::Running,
            _ => TaskStatus::Failure,
        })
    }

    fn cancel(&mut self, ctx: &mut StepContext<'_>) {
        self.child.cancel(ctx);
    }

    fn reset(&mut self) {
        self.child.reset();
    }
}

/// Re-runs its child `times` times (forever when `None`). At most one child run finishes per
/// step, so an instant child cannot spin a step forever.
pub struct Repeat {
    child: Box<dyn Task>,
    times: Option<u64>,
    count: u64,
}

impl Repeat {
    pub fn new(child: Box<dyn Task>, times: Option<u64>) -> Self {
        Self {
            child,
            times,
            count: 0,
        }
    }

    pub fn completed_runs(&self) -> u64 {
        self.count
    }
}

impl Task for Repeat {
    fn tick(&mut self, ctx: &mut StepContext<'_>) -> Result<TaskStatus, StepError> {
        if self.times == Some(0) {
            return Ok(TaskStatus::Success);
        }
        if self.child.tick(ctx)? == TaskStatus::Running {
            return Ok(TaskStatus::Running);
        }
        self.count += 1;
        self.child.reset();
        match self.times {
            Some(times) if self.count >= times => {
                self.reset();
                Ok(TaskStatus::Success)
            }
            _ => Ok(TaskStatus::Running),
        }
    }

    fn cancel(&mut self, ctx: &mut StepContext<'_>) {
        self.child.cancel(ctx);
        self.count = 0;
    }

    fn reset(&mut self) {
        self.count = 0;
        self.child.reset();
    }
}

/// Re-runs its child until it answers `until`, then succeeds.
struct Until {
    child: Box<dyn Task>,
    until: TaskStatus,
}

impl Until {
    fn tick(&mut self, ctx: &mut StepContext<'_>) -> Result<TaskStatus, StepError> {
        let status = self.child.tick(ctx)?;
        if status == self.until {
            self.child.reset();
            return Ok(TaskStatus::Success);
        }
        if status != TaskStatus::Running {
            self.child.reset();
        }
        Ok(TaskStatus::Running)
    }
}

pub struct UntilSuccess {
    body: Until,
}

impl UntilSuccess {
    pub fn new(child: Box<dyn Task>) -> Self {
        Self {
            body: Until {
                child,
                until: TaskStatus::Success,
            },
        }
    }
}

impl Task for UntilSuccess {
    fn tick(&mut self, ctx: &mut StepContext<'_>) -> Result<TaskStatus, StepError> {
        self.body.tick(ctx)
    }

    fn cancel(&mut self, ctx: &mut StepContext<'_>) {
        self.body.child.cancel(ctx);
    }

    fn reset(&mut self) {
        self.body.child.reset();
    }
}

pub struct UntilFail {
    body: Until,
}

impl UntilFail {
    pub fn new(child: Box<dyn Task>) -> Self {
        Self {
            body: Until {
                child,
                until: TaskStatus::Failure,
            },
        }
    }
}

impl Task for UntilFail {
    fn tick(&mut self, ctx: &mut StepContext<'_>) -> Result<TaskStatus, StepError> {
        self.body.tick(ctx)
    }

    fn cancel(&mut self, ctx: &mut StepContext<'_>) {
        self.body.child.cancel(ctx);
    }

    fn reset(&mut self) {
        self.body.child.reset();
    }
}

#[derive(Debug, Default)]
pub struct Succeed;

impl Task for Succeed {
    fn tick(&mut self, _ctx: &mut StepContext<'_>) -> Result<TaskStatus, StepError> {
        Ok(TaskStatus::Success)
    }

    fn reset(&mut self) {}
}

#[derive(Debug, Default)]
pub struct Fail;

impl Task for Fail {
    fn tick(&mut self, _ctx: &mut StepContext<'_>) -> Result<TaskStatus, StepError> {
        Ok(TaskStatus::Failure)
    }

    fn reset(&mut self) {}
}

/// Runs for `ticks` steps, then succeeds on the following one.
#[derive(Debug)]
pub struct Wait {
    ticks: u64,
    elapsed: u64,
}

impl Wait {
    pub fn new(ticks: u64) -> Self {
        Self { ticks, elapsed: 0 }
    }
}

impl Task for Wait {
    fn tick(&mut self, _ctx: &mut StepContext<'_>) -> Result<TaskStatus, StepError> {
        if self.elapsed >= self.ticks {
            self.elapsed = 0;
            return Ok(TaskStatus::Success);
        }
        self.elapsed += 1;
        Ok(TaskStatus::Running)
    }

    fn reset(&mut self) {
        self.elapsed = 0;
    }
}

/// Leaf answering `Success` when the predicate holds.
pub struct Condition<F> {
    cond: F,
}

impl<F> Condition<F>
where
    F: FnMut(&Blackboard) -> bool + 'static,
{
    pub fn new(cond: F) -> Self {
        Self { cond }
    }
}

impl<F> Task for Condition<F>
where
    F: FnMut(&Blackboard) -> bool + 'static,
{
    fn tick(&mut self, ctx: &mut StepContext<'_>) -> Result<TaskStatus, StepError> {
        if (self.cond)(&*ctx.blackboard) {
            Ok(TaskStatus::Success)
        } else {
            Ok(TaskStatus::Failure)
        }
    }

    fn reset(&mut self) {}
}

/// Leaf backed by a closure with full access to the step context.
pub struct Leaf<F> {
    run: F,
}

impl<F> Leaf<F>
where
    F: FnMut(&mut StepContext<'_>) -> Result<TaskStatus, StepError> + 'static,
{
    pub fn new(run: F) -> Self {
        Self { run }
    }
}

impl<F> Task for Leaf<F>
where
    F: FnMut(&mut StepContext<'_>) -> Result<TaskStatus, StepError> + 'static,
{
    fn tick(&mut self, ctx: &mut StepContext<'_>) -> Result<TaskStatus, StepError> {
        (self.run)(ctx)
    }

    fn reset(&mut self) {}
}
