//! Decoration chains.
//!
//! Decorators of one service are applied in ascending priority, ties in
//! registration order. The first one applied wraps the original service,
//! which moves to that decorator's inner id; each later decorator wraps the
//! previous one, and the decorated id finally aliases the outermost.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use tracing::debug;

use super::Slot;
use crate::error::ContainerError;

struct Decoration {
    decorator: String,
    inner_id: String,
    priority: i32,
    order: usize,
}

/// Rewires `slots` and `aliases` for every decoration chain.
///
/// Returns the errors found; chains with an error are left untouched.
pub(crate) fn apply(slots: &mut [Slot<'_>], aliases: &mut BTreeMap<String, String>) -> Vec<ContainerError> {
    let mut errors = Vec::new();
    let targets: HashMap<String, String> = slots
        .iter()
        .filter_map(|slot| {
            let link = slot.definition.get_decorator()?;
            Some((slot.id.clone(), link.inner_id.clone()))
        })
        .collect();

    let cyclic = find_cycles(&targets, &mut errors);

    let mut chains: BTreeMap<String, Vec<Decoration>> = BTreeMap::new();
    for slot in slots.iter() {
        let Some(link) = slot.definition.get_decorator() else {
            continue;
        };
        if cyclic.contains(&slot.id) {
            continue;
        }
        chains.entry(link.inner_id.clone()).or_default().push(Decoration {
            decorator: slot.id.clone(),
            inner_id: link.inner_alias(&slot.id),
            priority: link.priority,
            order: slot.order,
        });
    }

    for (target, mut decorations) in chains {
        decorations.sort_by_key(|decoration| (decoration.priority, decoration.order));
        if let Err(error) = apply_chain(&target, &decorations, slots, aliases) {
            errors.push(error);
        }
    }

    errors
}

fn apply_chain(
    target: &str,
    decorations: &[Decoration],
    slots: &mut [Slot<'_>],
    aliases: &mut BTreeMap<String, String>,
) -> Result<(), ContainerError> {
    let Some(first) = decorations.first() else {
        return Ok(());
    };

    let target_slot = slots.iter().position(|slot| slot.id == target);
    if target_slot.is_none() && !aliases.contains_key(target) {
        return Err(ContainerError::for_service(
            first.decorator.as_str(),
            ContainerError::NotFound(target.to_string()),
        ));
    }

    for decoration in decorations {
        let taken = slots.iter().any(|slot| slot.id == decoration.inner_id)
            || aliases.contains_key(&decoration.inner_id)
            || decorations
                .iter()
                .filter(|other| other.inner_id == decoration.inner_id)
                .count()
                > 1;
        if taken {
            return Err(ContainerError::for_service(
                decoration.decorator.as_str(),
                ContainerError::InvalidArgument(format!(
                    "The inner id [{}] of the decorated service [{}] is already in use.",
                    decoration.inner_id, target
                )),
            ));
        }
    }

    match target_slot {
        Some(index) => slots[index].id = first.inner_id.clone(),
        None => {
            let original = aliases.get(target).cloned().unwrap_or_default();
            aliases.insert(first.inner_id.clone(), original);
        }
    }

    for pair in decorations.windows(2) {
        aliases.insert(pair[1].inner_id.clone(), pair[0].decorator.clone());
    }

    let outermost = decorations.last().unwrap_or(first);
    aliases.insert(target.to_string(), outermost.decorator.clone());
    debug!(
        service = target,
        outermost = %outermost.decorator,
        decorators = decorations.len(),
        "applied decoration chain"
    );

    Ok(())
}

/// Decorators that (transitively) decorate themselves.
fn find_cycles(targets: &HashMap<String, String>, errors: &mut Vec<ContainerError>) -> BTreeSet<String> {
    let mut cyclic = BTreeSet::new();
    let mut reported: BTreeSet<Vec<String>> = BTreeSet::new();
    let mut decorators: Vec<&String> = targets.keys().collect();
    decorators.sort();

    for decorator in decorators {
        let mut path = vec![decorator.clone()];
        let mut current = &targets[decorator];
        loop {
            if let Some(start) = path.iter().position(|seen| seen == current) {
                let mut cycle = path[start..].to_vec();
                cycle.push(current.clone());
                cyclic.extend(path.iter().cloned());

                let mut members = cycle[..cycle.len() - 1].to_vec();
                members.sort();
                if reported.insert(members) {
                    errors.push(ContainerError::DecorationCycle(cycle));
                }
                break;
            }
            path.push(current.clone());
            match targets.get(current) {
                Some(next) => current = next,
                None => break,
            }
        }
    }

    cyclic
}
