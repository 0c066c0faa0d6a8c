//! Transfer item execution.
//!
//! The flow splits on the `internal` flag in the item details. An external
//! transfer submits a transfer request to the backend and leaves the item
//! pending until the losing registrar acks or rejects it. An internal
//! transfer is a take-over between two of our own accounts: no backend
//! transfer happens, instead ownership and contacts are reassigned locally
//! and the backend is updated to match.

use anyhow::Context;
use tracing::{info, warn};

use namegrid_billing::{ItemOutcome, Order, OrderItem};
use namegrid_registry::{Contact, ContactRole, ContactSyncOptions, StepLog, SyncOptions};

use crate::executor::{step_messages, ItemExecutor};

pub(crate) const ERR_BAD_TRANSFER_CODE: &str = "invalid transfer code";

pub(crate) fn execute_transfer(
    exec: &ItemExecutor,
    order: &Order,
    item: &OrderItem,
) -> anyhow::Result<ItemOutcome> {
    if item.details.internal() {
        execute_internal_takeover(exec, order, item)
    } else {
        execute_external_transfer(exec, item)
    }
}

/// Submit the transfer request; completion arrives asynchronously, so a
/// successful submission only moves the item to pending and defers the
/// charge.
fn execute_external_transfer(exec: &ItemExecutor, item: &OrderItem) -> anyhow::Result<ItemOutcome> {
    let code = item.details.transfer_code().unwrap_or_default();
    match exec.registry.transfer_request(&item.domain_name, code) {
        Ok(steps) => Ok(ItemOutcome::pending(step_messages(&steps))),
        Err(e) => Ok(ItemOutcome::failed_with_outputs(e.output_chain())),
    }
}

/// Take over a domain already sponsored by us.
fn execute_internal_takeover(
    exec: &ItemExecutor,
    order: &Order,
    item: &OrderItem,
) -> anyhow::Result<ItemOutcome> {
    let name = item.domain_name.as_str();

    // The domain may not be cached locally yet (e.g. bought at auction).
    // Pull it from the backend before anything else.
    let mut record = match exec.domains.find_by_name(name)? {
        Some(record) => record,
        None => {
            let options = SyncOptions::default()
                .with_refresh_contacts(true)
                .with_create_new_owner_allowed(true);
            exec.registry
                .synchronize_from_backend(name, &options)
                .with_context(|| format!("synchronizing {name} before take-over"))?;
            match exec.domains.find_by_name(name)? {
                Some(record) => record,
                None => {
                    // Backend answered but the record still did not land
                    // locally; leave the item executing for a later retry.
                    warn!(domain = name, "domain still unknown after synchronization");
                    return Ok(ItemOutcome::default());
                }
            }
        }
    };

    // Validate the code only against a stored key; a domain whose key was
    // never set (or already cleared) is taken over without one.
    let supplied = item.details.transfer_code().unwrap_or_default();
    if record
        .auth_key
        .as_deref()
        .is_some_and(|key| !key.is_empty() && key != supplied)
    {
        return Ok(ItemOutcome::blocked(ERR_BAD_TRANSFER_CODE));
    }

    let first_contact = ensure_contact(exec, order)?;
    let registrant = exec
        .contacts
        .oldest_registrant(order.owner)?
        .unwrap_or_else(|| first_contact.clone());

    // Reassign local ownership: new registrant, fresh admin/tech contacts,
    // previous account's contacts dropped.
    exec.domains.change_registrant(name, registrant.id, true)?;
    for role in ContactRole::ALL {
        exec.domains.detach_contact(name, role)?;
    }
    exec.domains
        .join_contact(name, ContactRole::Admin, first_contact.id)?;
    exec.domains
        .join_contact(name, ContactRole::Tech, first_contact.id)?;
    record = exec.domains.reload(name)?;
    record.owner = order.owner;
    exec.domains.persist(&record)?;

    let mut steps: Vec<StepLog> = Vec::new();

    let options = SyncOptions::default()
        .with_refresh_contacts(true)
        .with_rewrite_contacts(item.details.rewrite_contacts())
        .with_change_owner_allowed(true)
        .with_create_new_owner_allowed(true)
        .with_soft_delete(true)
        .with_expected_owner(order.owner);
    match exec.registry.synchronize_from_backend(name, &options) {
        Ok(ran) => steps.extend(ran),
        Err(e) => return Ok(ItemOutcome::failed_with_outputs(e.output_chain())),
    }

    record = exec.domains.reload(name)?;
    let contact_options = ContactSyncOptions {
        merge_duplicates: true,
        rewrite_registrant: true,
        new_registrant: Some(registrant.id),
    };
    match exec.registry.synchronize_contacts(&record, &contact_options) {
        Ok(ran) => steps.extend(ran),
        Err(e) => return Ok(ItemOutcome::failed_with_outputs(e.output_chain())),
    }

    // The consumed transfer code must stop working: rotate the auth info at
    // the backend, then drop the local copy.
    match exec.registry.set_auth_info(&record) {
        Ok(ran) => steps.extend(ran),
        Err(e) => {
            return Ok(ItemOutcome::failed_with_error_and_outputs(
                e.message.clone(),
                e.output_chain(),
            ))
        }
    }
    record.auth_key = None;
    exec.domains.persist(&record)?;

    info!(
        domain = name,
        new_owner = %order.owner,
        "internal take-over completed"
    );
    Ok(ItemOutcome::processed_and_charged(step_messages(&steps)))
}

/// The new owner must have at least one contact to attach to the domain;
/// create one from the account profile if needed.
fn ensure_contact(exec: &ItemExecutor, order: &Order) -> anyhow::Result<Contact> {
    if let Some(contact) = exec.contacts.first_contact_of(order.owner)? {
        return Ok(contact);
    }
    let account = exec
        .accounts
        .find(order.owner)
        .with_context(|| format!("account {} not found", order.owner))?;
    Ok(exec
        .contacts
        .create_from_profile(order.owner, &account.profile)?)
}
