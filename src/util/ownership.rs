//! Group ownership for freshly created directories.
//!
//! New files inherit the group of the directory that contains them, so a
//! workspace created with the same group as the keg installation stays
//! accessible to everyone sharing that installation.

use std::io;
use std::path::Path;

/// The gid new workspaces should carry.
///
/// The reference path's group is used when the current process belongs to it
/// (effective or supplementary group). Otherwise `fallback` is used, and
/// without a fallback the real gid of the process.
#[cfg(unix)]
pub fn preferred_gid(reference: Option<&Path>, fallback: Option<u32>) -> u32 {
    use std::os::unix::fs::MetadataExt;

    if let Some(reference) = reference {
        match std::fs::metadata(reference) {
            Ok(meta) if is_group_member(meta.gid()) => return meta.gid(),
            Ok(_) => {}
            Err(e) => tracing::debug!("cannot stat {}: {}", reference.display(), e),
        }
    }

    fallback.unwrap_or_else(|| nix::unistd::getgid().as_raw())
}

#[cfg(not(unix))]
pub fn preferred_gid(_reference: Option<&Path>, fallback: Option<u32>) -> u32 {
    fallback.unwrap_or(0)
}

/// True if the current process is a member of `gid`.
#[cfg(unix)]
pub fn is_group_member(gid: u32) -> bool {
    use nix::unistd::{getegid, Gid};

    let gid = Gid::from_raw(gid);
    getegid() == gid || in_supplementary_groups(gid)
}

#[cfg(all(unix, not(target_vendor = "apple")))]
fn in_supplementary_groups(gid: nix::unistd::Gid) -> bool {
    nix::unistd::getgroups()
        .map(|groups| groups.contains(&gid))
        .unwrap_or(false)
}

// No getgroups binding on Apple targets; ask the group database.
#[cfg(target_vendor = "apple")]
fn in_supplementary_groups(gid: nix::unistd::Gid) -> bool {
    use nix::unistd::{getuid, Group, User};

    let user = match User::from_uid(getuid()) {
        Ok(Some(user)) => user,
        _ => return false,
    };
    if user.gid == gid {
        return true;
    }
    match Group::from_gid(gid) {
        Ok(Some(group)) => group.mem.contains(&user.name),
        _ => false,
    }
}

#[cfg(not(unix))]
pub fn is_group_member(_gid: u32) -> bool {
    false
}

/// Change only the group of `path`.
#[cfg(unix)]
pub fn set_group(path: &Path, gid: u32) -> io::Result<()> {
    use nix::unistd::{chown, Gid};

    chown(path, None, Some(Gid::from_raw(gid))).map_err(io::Error::from)
}

#[cfg(not(unix))]
pub fn set_group(_path: &Path, _gid: u32) -> io::Result<()> {
    Ok(())
}

/// The group's name, or its number if it has no entry.
#[cfg(unix)]
pub fn group_label(gid: u32) -> String {
    use nix::unistd::{Gid, Group};

    match Group::from_gid(Gid::from_raw(gid)) {
        Ok(Some(group)) => group.name,
        _ => gid.to_string(),
    }
}

#[cfg(not(unix))]
pub fn group_label(gid: u32) -> String {
    gid.to_string()
}
