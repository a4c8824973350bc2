//! Create, bootstrap, join, and audit instances at shutdown.
//! See `SPEC_FULL.md` §4.I.

use std::collections::HashMap;
use std::sync::Arc;
use std::thread;

use crate::application::Application;
use crate::error::{Error, Result};
use crate::instance::Instance;

/// Creates a new instance as a child of `parent_offset` (or the
/// application root if `None`), starts its thread, and blocks until the
/// new thread reports `ACTIVE`. Returns the new offset.
///
/// The thread automatically sets `ACTIVE` and signals the creator, then
/// runs `bootstrap(app, instance)`, which is responsible for building a
/// concrete `ScriptHost`, loading the startup script or running whatever
/// the module does, and driving the event loop, and finally, if the
/// instance has an `exit_event_name`, posts it to the parent. Steps 1
/// (platform thread init) and 7 (deinit) have no equivalent here and are
/// left to `bootstrap` if the embedding platform needs them.
pub fn create_instance<F>(
    app: &Arc<Application>,
    parent_offset: Option<usize>,
    module_name: impl Into<String>,
    exit_event_name: Option<String>,
    bootstrap: F,
) -> usize
where
    F: FnOnce(Arc<Application>, Arc<Instance>) + Send + 'static,
{
    let instance = Instance::with_mailbox_capacity(
        0,
        module_name.into(),
        exit_event_name,
        parent_offset,
        app.mailbox_initial_slots(),
        app.mailbox_initial_bytes(),
    );
    let offset = app.registry.lock().unwrap().add(Arc::clone(&instance));
    instance.set_offset(offset);

    let thread_app = Arc::clone(app);
    let thread_instance = Arc::clone(&instance);
    let handle = thread::Builder::new()
        .name(format!("comexe-instance-{offset}"))
        .spawn(move || {
            thread_instance.mark_active();
            bootstrap(Arc::clone(&thread_app), Arc::clone(&thread_instance));
            if let Some(exit_event_name) = thread_instance.exit_event_name() {
                thread_app.post_exit(thread_instance.parent(), exit_event_name, thread_instance.offset());
            }
        })
        .expect("failed to spawn instance thread");
    *instance.thread.lock().unwrap() = Some(handle);

    instance.wait_until_active();
    offset
}

/// Validates `offset` under the registry mutex, joins its thread, then
/// removes it from the registry. Returns `false` (not an error) if the
/// offset was already gone, matches "double-join observes the slot
/// invalid and returns false".
pub fn join(app: &Application, offset: usize) -> Result<bool> {
    let instance = {
        let registry = app.registry.lock().unwrap();
        match registry.get(offset) {
            Some(instance) => Arc::clone(instance),
            None => return Ok(false),
        }
    };

    let handle = instance.thread.lock().unwrap().take();
    if let Some(handle) = handle {
        handle.join().map_err(|_| Error::JoinFailed)?;
    }

    let mut registry = app.registry.lock().unwrap();
    registry.remove(offset);
    Ok(true)
}

/// One entry in the shutdown-time instance tree.
struct TreeNode {
    offset: usize,
    module_name: String,
    children: Vec<TreeNode>,
}

/// Joins the main instance (offset 1), then audits every remaining slot:
/// any instance whose parent no longer resolves is reparented onto a
/// synthetic, never-registered "Orphans" root for reporting purposes only;
/// orphaned threads are not joined. Returns the rendered tree text.
pub fn run_application(app: &Arc<Application>) -> Result<String> {
    join(app, 1)?;

    let (roots, orphans) = {
        let registry = app.registry.lock().unwrap();
        let present: HashMap<usize, Arc<Instance>> = registry.iter().map(|(o, i)| (o, Arc::clone(i))).collect();

        let mut children_of: HashMap<usize, Vec<usize>> = HashMap::new();
        let mut roots = Vec::new();
        let mut orphans = Vec::new();

        for (&offset, instance) in &present {
            match instance.parent() {
                Some(parent) if present.contains_key(&parent) => {
                    children_of.entry(parent).or_default().push(offset);
                }
                Some(_) | None => {
                    // Parent already gone, or this instance's parent was the
                    // application root itself: report at top level. Only
                    // direct-parent reparenting is performed; no attempt is
                    // made to walk further up a chain of missing ancestors.
                    if instance.parent().is_some() {
                        orphans.push(offset);
                    } else {
                        roots.push(offset);
                    }
                }
            }
        }

        fn build(offset: usize, present: &HashMap<usize, Arc<Instance>>, children_of: &HashMap<usize, Vec<usize>>) -> TreeNode {
            let instance = &present[&offset];
            let children = children_of
                .get(&offset)
                .map(|kids| kids.iter().map(|&k| build(k, present, children_of)).collect())
                .unwrap_or_default();
            TreeNode {
                offset,
                module_name: instance.module_name().to_string(),
                children,
            }
        }

        let root_nodes: Vec<TreeNode> = roots.iter().map(|&o| build(o, &present, &children_of)).collect();
        let orphan_nodes: Vec<TreeNode> = orphans.iter().map(|&o| build(o, &present, &children_of)).collect();
        (root_nodes, orphan_nodes)
    };

    Ok(render_tree(&roots, &orphans))
}

fn render_tree(roots: &[TreeNode], orphans: &[TreeNode]) -> String {
    let mut out = String::new();
    for root in roots {
        out.push_str("* ");
        out.push_str(&format!("{} (#{})\n", root.module_name, root.offset));
        render_children(&root.children, "", &mut out);
    }
    if !orphans.is_empty() {
        out.push_str("* Orphans\n");
        for orphan in orphans {
            out.push_str("|   |-- ");
            out.push_str(&format!("{} (#{})\n", orphan.module_name, orphan.offset));
            render_children(&orphan.children, "|   ", &mut out);
        }
    }
    out
}

fn render_children(children: &[TreeNode], prefix: &str, out: &mut String) {
    for child in children {
        out.push_str(prefix);
        out.push_str("|   |-- ");
        out.push_str(&format!("{} (#{})\n", child.module_name, child.offset));
        render_children(&child.children, &format!("{prefix}|   "), out);
    }
}
