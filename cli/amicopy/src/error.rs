//! Error display for the CLI.

use amicopy_workflow::CopyError;
use colored::Colorize;

/// Print an error in a user-friendly format.
pub fn print_error(err: &anyhow::Error) {
    eprintln!("{} {:#}", "Error:".red().bold(), err);

    let Some(copy_err) = err.downcast_ref::<CopyError>() else {
        return;
    };

    if let Some(note) = leftovers_note(copy_err) {
        eprintln!("\n{}", note.yellow());
    }

    if let Some(hint) = hint(copy_err) {
        eprintln!("\n{}", format!("Hint: {hint}").yellow());
    }
}

/// Names the resources the failed run left in place.
fn leftovers_note(err: &CopyError) -> Option<String> {
    match (err.leaked_snapshot(), err.leaked_image()) {
        (Some(snapshot_id), Some(image_id)) => Some(format!(
            "Note: the copied snapshot {snapshot_id} and the new image {image_id} were left \
             in place. Deregister and delete them if you do not need them."
        )),
        (Some(snapshot_id), None) => Some(format!(
            "Note: the copied snapshot {snapshot_id} was left in place. \
             Delete it if you do not need it."
        )),
        (None, Some(image_id)) => Some(format!(
            "Note: the new image {image_id} was left in place. \
             Deregister it if you do not need it."
        )),
        (None, None) => None,
    }
}

fn hint(err: &CopyError) -> Option<&'static str> {
    match err {
        CopyError::ResourceLookup {
            resource,
            leftovers,
            ..
        } => {
            if !leftovers.is_empty() {
                Some("The status check failed while waiting; the copy may still finish on the provider side.")
            } else if resource.starts_with("snapshot") {
                Some("Check that the AMI's root snapshot is readable from your account in the selected region.")
            } else {
                Some("Check the AMI id and that it exists in the selected region (--region).")
            }
        }
        CopyError::CopyRequest { .. } => {
            Some("Your credentials need the ec2:CopySnapshot permission.")
        }
        CopyError::RegistrationRequest { .. } => {
            Some("Your credentials need the ec2:RegisterImage permission.")
        }
        CopyError::Timeout { .. } => {
            Some("The copy is still running on the provider side. Retry with a larger --timeout.")
        }
        _ => None,
    }
}
