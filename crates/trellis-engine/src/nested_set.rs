//! Nested-set numbering for ordered forests.
//!
//! Pages and menu items store materialized child lists; their `lft`/`rgt`
//! markers and depths are derived from those lists with [`number`] after each
//! structural change.

/// Position of a node in a nested-set numbering.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Interval {
    pub(crate) lft: u32,
    pub(crate) rgt: u32,
    pub(crate) depth: u32,
}

enum Frame<K> {
    Enter(K, u32),
    Exit(usize),
}

/// Number a forest in pre-order, starting at 1.
///
/// `children` yields the ordered children of a node. Returns every reachable
/// node with its interval, in `lft` order. Iterative, so deep trees do not
/// grow the call stack.
pub(crate) fn number<K, F, I>(roots: &[K], mut children: F) -> Vec<(K, Interval)>
where
    K: Copy,
    F: FnMut(K) -> I,
    I: IntoIterator<Item = K>,
{
    let mut numbered: Vec<(K, Interval)> = Vec::new();
    let mut counter = 1u32;
    let mut stack: Vec<Frame<K>> = roots.iter().rev().map(|&k| Frame::Enter(k, 0)).collect();

    while let Some(frame) = stack.pop() {
        match frame {
            Frame::Enter(key, depth) => {
                let slot = numbered.len();
                numbered.push((
                    key,
                    Interval {
                        lft: counter,
                        rgt: 0,
                        depth,
                    },
                ));
                counter += 1;
                stack.push(Frame::Exit(slot));

                let kids: Vec<K> = children(key).into_iter().collect();
                stack.extend(kids.into_iter().rev().map(|child| Frame::Enter(child, depth + 1)));
            }
            Frame::Exit(slot) => {
                numbered[slot].1.rgt = counter;
                counter += 1;
            }
        }
    }

    numbered
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn forest() -> HashMap<u32, Vec<u32>> {
        // 1 -> [2 -> [4], 3]
        HashMap::from([(1, vec![2, 3]), (2, vec![4]), (3, vec![]), (4, vec![])])
    }

    #[test]
    fn test_number_single_node() {
        let numbered = number(&[7u32], |_| Vec::new());

        assert_eq!(
            numbered,
            vec![(
                7,
                Interval {
                    lft: 1,
                    rgt: 2,
                    depth: 0
                }
            )]
        );
    }

    #[test]
    fn test_number_nested_tree_in_pre_order() {
        let tree = forest();

        let numbered = number(&[1u32], |k| tree[&k].clone());

        let keys: Vec<u32> = numbered.iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, vec![1, 2, 4, 3]);

        let intervals: HashMap<u32, Interval> = numbered.into_iter().collect();
        assert_eq!((intervals[&1].lft, intervals[&1].rgt), (1, 8));
        assert_eq!((intervals[&2].lft, intervals[&2].rgt), (2, 5));
        assert_eq!((intervals[&4].lft, intervals[&4].rgt), (3, 4));
        assert_eq!((intervals[&3].lft, intervals[&3].rgt), (6, 7));
        assert_eq!(intervals[&4].depth, 2);
    }

    #[test]
    fn test_number_multiple_roots_continue_counter() {
        let numbered = number(&[1u32, 2], |_| Vec::new());

        assert_eq!(numbered[1].1.lft, 3);
        assert_eq!(numbered[1].1.rgt, 4);
        assert_eq!(numbered[1].1.depth, 0);
    }

    #[test]
    fn test_number_empty_forest() {
        let numbered = number::<u32, _, Vec<u32>>(&[], |_| Vec::new());

        assert!(numbered.is_empty());
    }
}
