//! Failure-aware Router
//!
//! A pure decision function: given a registry snapshot, the batch scenario and a
//! transaction, it returns a [`DispatchPlan`]. It never executes anything and never
//! mutates the registry or the stash.
//!
//! | Scenario        | requested     | kind    | plan                                   |
//! |-----------------|---------------|---------|----------------------------------------|
//! | Normal          | any           | any     | `DirectExecute(requested)`             |
//! | CentralDown     | central       | any     | `RedirectExecute(owner_of(fragment))`  |
//! | CentralDown     | fragment node | any     | `DirectExecute(requested)`             |
//! | FragmentDown(X) | X             | read    | `RedirectExecute(central)`             |
//! | FragmentDown(X) | X             | write   | `FallbackExecuteAndStash(central, X)`  |
//! | FragmentDown(X) | not X         | any     | `DirectExecute(requested)`             |
//!
//! Everything the table does not cover (unknown nodes, an unknown operation kind
//! on a down fragment, a fallback target that is itself down) is rejected with
//! `NodeDownRouting`.

use super::classifier::{descriptor_fragment, descriptor_kind};
use super::types::{DispatchPlan, OperationKind, Scenario, TransactionDescriptor};
use crate::error::RouterError;
use crate::topology::registry::RegistrySnapshot;

pub fn route(
    snapshot: &RegistrySnapshot,
    scenario: &Scenario,
    descriptor: &TransactionDescriptor,
) -> DispatchPlan {
    let requested = &descriptor.requested_node;

    if !snapshot.contains(requested) {
        return DispatchPlan::Reject(RouterError::NodeDownRouting(format!(
            "transaction {} requests unknown node {}",
            descriptor.id, requested
        )));
    }

    let plan = match scenario {
        Scenario::Normal => DispatchPlan::DirectExecute(requested.clone()),

        Scenario::CentralDown if snapshot.is_central(requested) => {
            route_around_central(snapshot, descriptor)
        }
        Scenario::CentralDown => DispatchPlan::DirectExecute(requested.clone()),

        Scenario::FragmentDown(down) if down == requested => {
            route_around_fragment(snapshot, descriptor)
        }
        Scenario::FragmentDown(down) if !snapshot.contains(down) || snapshot.is_central(down) => {
            DispatchPlan::Reject(RouterError::NodeDownRouting(format!(
                "scenario names {} which is not a fragment node",
                down
            )))
        }
        Scenario::FragmentDown(_) => DispatchPlan::DirectExecute(requested.clone()),
    };

    tracing::debug!(
        "Routed transaction {} (requested {}, scenario {:?}) -> {:?}",
        descriptor.id,
        requested,
        scenario,
        plan
    );

    plan
}

/// Central node requested while it is down: send the transaction to the node
/// owning the fragment its query references.
fn route_around_central(snapshot: &RegistrySnapshot, descriptor: &TransactionDescriptor) -> DispatchPlan {
    let owner = match descriptor_fragment(descriptor, snapshot.topology())
        .and_then(|fragment| snapshot.owner_of(&fragment))
    {
        Ok(owner) => owner,
        Err(e) => return DispatchPlan::Reject(e),
    };

    if !snapshot.is_up(&owner) {
        return DispatchPlan::Reject(RouterError::NodeDownRouting(format!(
            "central node is down and fragment owner {} is down too",
            owner
        )));
    }

    DispatchPlan::RedirectExecute(owner)
}

/// Requested fragment node is down: reads go to the central node, writes run on
/// the central node and are deferred to the fragment's stash.
fn route_around_fragment(snapshot: &RegistrySnapshot, descriptor: &TransactionDescriptor) -> DispatchPlan {
    let down = &descriptor.requested_node;
    let central = snapshot.central();

    if snapshot.is_central(down) {
        return DispatchPlan::Reject(RouterError::NodeDownRouting(format!(
            "{} is the central node, not a fragment node",
            down
        )));
    }

    if !snapshot.is_up(central) {
        return DispatchPlan::Reject(RouterError::NodeDownRouting(format!(
            "fragment node {} is down and central node {} is down too",
            down, central
        )));
    }

    match descriptor_kind(descriptor) {
        OperationKind::Read => DispatchPlan::RedirectExecute(central.clone()),
        OperationKind::Write => DispatchPlan::FallbackExecuteAndStash {
            exec: central.clone(),
            stash: down.clone(),
        },
        OperationKind::Unknown => DispatchPlan::Reject(RouterError::NodeDownRouting(format!(
            "fragment node {} is down and transaction {} is neither a read nor a write",
            down, descriptor.id
        ))),
    }
}
