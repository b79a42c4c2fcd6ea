//! Native stack accounting for recursive walkers
//!
//! The parser and the interpreter recurse once per nesting level of the
//! script. A [`StackBudget`] remembers where a walk started and reports when
//! the walk has used more than its share of the thread's stack, so deep input
//! becomes an ordinary error instead of a fatal overflow.

/// Stack a walk may use by default. Spawned threads get 2 MiB unless the
/// host asks for more.
pub const DEFAULT_STACK_BUDGET: usize = 1024 * 1024;

/// How much native stack a recursive walk may still use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackBudget {
    base: usize,
    limit: usize,
}

impl StackBudget {
    /// Start measuring from the caller's frame
    pub fn new(limit: usize) -> Self {
        Self {
            base: stack_position(),
            limit,
        }
    }

    /// Bytes of stack used since the budget was created
    pub fn used(&self) -> usize {
        stack_position().abs_diff(self.base)
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn exhausted(&self) -> bool {
        self.used() > self.limit
    }
}

impl Default for StackBudget {
    fn default() -> Self {
        Self::new(DEFAULT_STACK_BUDGET)
    }
}

#[inline(never)]
fn stack_position() -> usize {
    let marker = 0u8;
    std::hint::black_box(&marker) as *const u8 as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descend(budget: &StackBudget, levels: usize) -> bool {
        let padding = std::hint::black_box([0u8; 256]);
        if budget.exhausted() {
            return true;
        }
        if levels == 0 {
            return padding[0] == 1;
        }
        let deeper = descend(budget, levels - 1);
        deeper || padding[1] == 1
    }

    #[test]
    fn test_fresh_budget_is_not_exhausted() {
        let budget = StackBudget::new(64 * 1024);
        assert!(!budget.exhausted());
        assert_eq!(budget.limit(), 64 * 1024);
    }

    #[test]
    fn test_deep_recursion_exhausts_budget() {
        let budget = StackBudget::new(16 * 1024);
        assert!(descend(&budget, 100_000));
    }

    #[test]
    fn test_shallow_recursion_fits() {
        let budget = StackBudget::new(512 * 1024);
        assert!(!descend(&budget, 8));
    }
}
