//! Loop bookkeeping for `break` and `continue`.

use super::JumpLabel;

/// Stack of enclosing loops, innermost last.
#[derive(Debug, Default)]
pub struct JumpManager {
    loops: Vec<LoopContext>,
}

#[derive(Debug, Default)]
struct LoopContext {
    /// Backward target for `continue`, when already known.
    continue_target: Option<usize>,
    /// Forward `continue` jumps waiting for a target.
    continue_labels: Vec<JumpLabel>,
    /// Pending break jumps to patch when the loop exits.
    break_labels: Vec<JumpLabel>,
}

/// How a `continue` must be emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContinueJump {
    Backward(usize),
    Forward,
}

impl JumpManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter a loop whose `continue` target is already emitted.
    pub fn enter_loop(&mut self, continue_target: usize) {
        self.loops.push(LoopContext {
            continue_target: Some(continue_target),
            ..LoopContext::default()
        });
    }

    /// Enter a loop whose `continue` target comes after the body.
    pub fn enter_loop_deferred(&mut self) {
        self.loops.push(LoopContext::default());
    }

    /// Fix the `continue` target of the current loop and return the pending
    /// forward jumps to patch to it.
    pub fn set_continue_target(&mut self, target: usize) -> Vec<JumpLabel> {
        match self.loops.last_mut() {
            Some(ctx) => {
                ctx.continue_target = Some(target);
                std::mem::take(&mut ctx.continue_labels)
            }
            None => Vec::new(),
        }
    }

    /// Exit the current loop and return the break labels to patch.
    pub fn exit_loop(&mut self) -> Vec<JumpLabel> {
        self.loops
            .pop()
            .map(|ctx| ctx.break_labels)
            .unwrap_or_default()
    }

    pub fn in_loop(&self) -> bool {
        !self.loops.is_empty()
    }

    pub fn add_break(&mut self, label: JumpLabel) {
        if let Some(ctx) = self.loops.last_mut() {
            ctx.break_labels.push(label);
        }
    }

    pub fn add_continue(&mut self, label: JumpLabel) {
        if let Some(ctx) = self.loops.last_mut() {
            ctx.continue_labels.push(label);
        }
    }

    pub fn continue_jump(&self) -> Option<ContinueJump> {
        self.loops.last().map(|ctx| match ctx.continue_target {
            Some(target) => ContinueJump::Backward(target),
            None => ContinueJump::Forward,
        })
    }

    pub fn loop_depth(&self) -> usize {
        self.loops.len()
    }

    /// A manager with the same nesting but no recorded labels.
    ///
    /// Used while emitting into a scratch chunk so labels never leak into
    /// the real one.
    pub fn detached(&self) -> Self {
        Self {
            loops: (0..self.loops.len())
                .map(|_| LoopContext::default())
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_loops() {
        let mut manager = JumpManager::new();
        manager.enter_loop(10);
        manager.enter_loop(20);
        assert_eq!(manager.loop_depth(), 2);
        assert_eq!(manager.continue_jump(), Some(ContinueJump::Backward(20)));

        manager.exit_loop();
        assert_eq!(manager.continue_jump(), Some(ContinueJump::Backward(10)));
    }

    #[test]
    fn deferred_continue_collects_forward_jumps() {
        let mut manager = JumpManager::new();
        manager.enter_loop_deferred();
        assert_eq!(manager.continue_jump(), Some(ContinueJump::Forward));
        manager.add_continue(JumpLabel(4));
        manager.add_continue(JumpLabel(9));

        let pending = manager.set_continue_target(30);
        assert_eq!(pending, vec![JumpLabel(4), JumpLabel(9)]);
        assert_eq!(manager.continue_jump(), Some(ContinueJump::Backward(30)));
    }

    #[test]
    fn exit_loop_returns_breaks() {
        let mut manager = JumpManager::new();
        manager.enter_loop(10);
        manager.add_break(JumpLabel(100));
        manager.add_break(JumpLabel(110));
        assert_eq!(manager.exit_loop(), vec![JumpLabel(100), JumpLabel(110)]);
        assert!(!manager.in_loop());
        assert!(manager.exit_loop().is_empty());
    }

    #[test]
    fn detached_keeps_depth_only() {
        let mut manager = JumpManager::new();
        manager.enter_loop(10);
        manager.add_break(JumpLabel(1));
        let mut detached = manager.detached();
        assert_eq!(detached.loop_depth(), 1);
        assert!(detached.exit_loop().is_empty());
    }
}
