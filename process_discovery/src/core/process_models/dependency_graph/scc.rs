//! Tarjan's algorithm over index-based adjacency lists
//!
//! Runs on an explicit stack of `(node, next successor)` frames so that deep graphs
//! do not exhaust the call stack. Components are emitted in the same order as by the
//! recursive formulation (reverse topological order of the condensation), and the members
//! of each component in the order they are popped from the Tarjan stack.

#[derive(Debug, Clone, Copy)]
struct Frame {
    node: usize,
    next: usize,
}

/// Strongly connected components of the graph with nodes `0..successors.len()`
///
/// `successors[v]` lists the targets of all edges leaving `v`; roots are visited in
/// ascending index order and successors in the given order.
pub fn strongly_connected_components(successors: &[Vec<usize>]) -> Vec<Vec<usize>> {
    let n = successors.len();
    let mut index: Vec<Option<usize>> = vec![None; n];
    let mut lowlink: Vec<usize> = vec![0; n];
    let mut on_stack: Vec<bool> = vec![false; n];
    let mut stack: Vec<usize> = Vec::new();
    let mut counter = 0;
    let mut components: Vec<Vec<usize>> = Vec::new();

    for root in 0..n {
        if index[root].is_some() {
            continue;
        }
        index[root] = Some(counter);
        lowlink[root] = counter;
        counter += 1;
        stack.push(root);
        on_stack[root] = true;
        let mut work = vec![Frame {
            node: root,
            next: 0,
        }];

        while let Some(frame) = work.last_mut() {
            let v = frame.node;
            if let Some(&w) = successors[v].get(frame.next) {
                frame.next += 1;
                match index[w] {
                    None => {
                        index[w] = Some(counter);
                        lowlink[w] = counter;
                        counter += 1;
                        stack.push(w);
                        on_stack[w] = true;
                        work.push(Frame { node: w, next: 0 });
                    }
                    Some(iw) => {
                        if on_stack[w] {
                            lowlink[v] = lowlink[v].min(iw);
                        }
                    }
                }
                continue;
            }

            // all successors of v done
            work.pop();
            if let Some(parent) = work.last() {
                lowlink[parent.node] = lowlink[parent.node].min(lowlink[v]);
            }
            if index[v] == Some(lowlink[v]) {
                let mut component = Vec::new();
                while let Some(w) = stack.pop() {
                    on_stack[w] = false;
                    component.push(w);
                    if w == v {
                        break;
                    }
                }
                components.push(component);
            }
        }
    }
    components
}
