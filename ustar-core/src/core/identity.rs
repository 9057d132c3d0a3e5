//! Owner and group name lookup for header encoding.
//!
//! Headers carry both the numeric ids and the names they resolve to. The
//! lookup sits behind [`IdentityResolver`] so callers can substitute fixed
//! names (`--owner`/`--group`) without touching the system databases.

use std::ffi::CStr;

/// Resolves numeric user and group ids to display names.
pub trait IdentityResolver {
    fn user_name(&self, uid: u32) -> Option<String>;
    fn group_name(&self, gid: u32) -> Option<String>;
}

/// Looks names up in the system user and group databases
/// (`getpwuid_r` / `getgrgid_r`).
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemIdentity;

// Upper bound for the reentrant lookup buffer; entries beyond this are treated as unresolved.
const MAX_LOOKUP_BUFFER: usize = 1024 * 1024;

impl IdentityResolver for SystemIdentity {
    fn user_name(&self, uid: u32) -> Option<String> {
        let mut buf = vec![0 as libc::c_char; initial_buffer_len(libc::_SC_GETPW_R_SIZE_MAX)];
        loop {
            // SAFETY: `passwd` is plain old data; getpwuid_r fills it on success.
            let mut pwd: libc::passwd = unsafe { std::mem::zeroed() };
            let mut result: *mut libc::passwd = std::ptr::null_mut();
            // SAFETY: every pointer is valid for the duration of the call and
            // `buf.len()` is the true length of `buf`.
            let rc = unsafe {
                libc::getpwuid_r(
                    uid as libc::uid_t,
                    &mut pwd,
                    buf.as_mut_ptr(),
                    buf.len(),
                    &mut result,
                )
            };
            if rc == libc::ERANGE && buf.len() < MAX_LOOKUP_BUFFER {
                buf.resize(buf.len() * 2, 0);
                continue;
            }
            if rc != 0 || result.is_null() || pwd.pw_name.is_null() {
                return None;
            }
            // SAFETY: on success pw_name points into `buf` and is NUL terminated.
            let name = unsafe { CStr::from_ptr(pwd.pw_name) };
            return Some(name.to_string_lossy().into_owned());
        }
    }

    fn group_name(&self, gid: u32) -> Option<String> {
        let mut buf = vec![0 as libc::c_char; initial_buffer_len(libc::_SC_GETGR_R_SIZE_MAX)];
        loop {
            // SAFETY: `group` is plain old data; getgrgid_r fills it on success.
            let mut grp: libc::group = unsafe { std::mem::zeroed() };
            let mut result: *mut libc::group = std::ptr::null_mut();
            // SAFETY: as in `user_name`.
            let rc = unsafe {
                libc::getgrgid_r(
                    gid as libc::gid_t,
                    &mut grp,
                    buf.as_mut_ptr(),
                    buf.len(),
                    &mut result,
                )
            };
            if rc == libc::ERANGE && buf.len() < MAX_LOOKUP_BUFFER {
                buf.resize(buf.len() * 2, 0);
                continue;
            }
            if rc != 0 || result.is_null() || grp.gr_name.is_null() {
                return None;
            }
            // SAFETY: on success gr_name points into `buf` and is NUL terminated.
            let name = unsafe { CStr::from_ptr(grp.gr_name) };
            return Some(name.to_string_lossy().into_owned());
        }
    }
}

fn initial_buffer_len(name: libc::c_int) -> usize {
    // SAFETY: sysconf has no memory-safety preconditions.
    let hint = unsafe { libc::sysconf(name) };
    if hint > 0 {
        hint as usize
    } else {
        1024
    }
}

/// Reports the same names for every id. Either name may be left unset, in
/// which case that lookup falls through to `fallback`.
#[derive(Debug, Clone, Default)]
pub struct FixedIdentity<R = SystemIdentity> {
    pub user: Option<String>,
    pub group: Option<String>,
    pub fallback: R,
}

impl FixedIdentity<SystemIdentity> {
    pub fn new(user: Option<String>, group: Option<String>) -> Self {
        Self {
            user,
            group,
            fallback: SystemIdentity,
        }
    }
}

impl<R: IdentityResolver> IdentityResolver for FixedIdentity<R> {
    fn user_name(&self, uid: u32) -> Option<String> {
        match &self.user {
            Some(name) => Some(name.clone()),
            None => self.fallback.user_name(uid),
        }
    }

    fn group_name(&self, gid: u32) -> Option<String> {
        match &self.group {
            Some(name) => Some(name.clone()),
            None => self.fallback.group_name(gid),
        }
    }
}
