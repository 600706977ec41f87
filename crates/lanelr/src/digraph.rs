//! DeRemer and Pennello's digraph algorithm over index-addressed relations.

use std::cmp;

pub trait Set {
    /// Returns `true` if `self` changed.
    fn union_with(&mut self, other: &Self) -> bool;
}

/// Compute `F(x) = F'(x) ∪ ⋃{ F(y) | x R y }` in place.
///
/// `values[x]` holds `F'(x)` on entry and `F(x)` on return; `edges[x]` lists
/// every `y` with `x R y`.
pub fn digraph<T>(values: &mut [T], edges: &[Vec<usize>])
where
    T: Set,
{
    debug_assert_eq!(values.len(), edges.len());
    Digraph {
        values,
        edges,
        n: vec![0usize; edges.len()],
        stack: vec![],
    }
    .run()
}

struct Digraph<'a, T> {
    values: &'a mut [T],
    edges: &'a [Vec<usize>],
    n: Vec<usize>,
    stack: Vec<usize>,
}

impl<T> Digraph<'_, T>
where
    T: Set,
{
    fn run(&mut self) {
        for x in 0..self.edges.len() {
            if self.n[x] == 0 {
                self.traverse(x);
            }
        }
    }

    fn traverse(&mut self, x: usize) {
        self.stack.push(x);
        let d = self.stack.len();
        self.n[x] = d;

        let edges = self.edges;
        for &y in &edges[x] {
            if self.n[y] == 0 {
                self.traverse(y);
            }
            self.n[x] = cmp::min(self.n[x], self.n[y]);

            if x != y {
                // F(x) <- F(x) \cup F(y)
                let (slot, added) = get_two_mut(self.values, x, y);
                slot.union_with(added);
            }
        }

        if self.n[x] != d {
            return;
        }

        while let Some(s) = self.stack.pop() {
            self.n[s] = usize::MAX;
            if s == x {
                break;
            }
            // F(s) <- F(x)
            let (slot, added) = get_two_mut(self.values, s, x);
            slot.union_with(added);
        }
    }
}

fn get_two_mut<V>(slice: &mut [V], x: usize, y: usize) -> (&mut V, &mut V) {
    assert!(
        x != y && cmp::max(x, y) < slice.len(),
        "index condition not satisfied"
    );
    if x < y {
        let (a, b) = slice.split_at_mut(y);
        (&mut a[x], &mut b[0])
    } else {
        let (a, b) = slice.split_at_mut(x);
        (&mut b[0], &mut a[y])
    }
}
