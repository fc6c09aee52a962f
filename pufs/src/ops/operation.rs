//! Operation names and their static gate/policy bindings.

use std::fmt;

use crate::dispatch::Gate;
use crate::policy::Policy;

/// Every filesystem operation the mount can receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Init,
    Destroy,
    Getattr,
    Access,
    Readlink,
    Open,
    Read,
    Flush,
    Fsync,
    Release,
    Opendir,
    Readdir,
    Releasedir,
    Fsyncdir,
    Statfs,
    Getxattr,
    Listxattr,
    // Mutating operations
    Create,
    Write,
    Rename,
    Unlink,
    Mkdir,
    Rmdir,
    Mknod,
    Chmod,
    Chown,
    Symlink,
    Link,
    Setxattr,
    Removexattr,
    Truncate,
    Utimens,
}

/// How an operation is routed through the union engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Binding {
    pub gate: Gate,
    pub policy: Policy,
}

const fn bind(gate: Gate, policy: Policy) -> Option<Binding> {
    Some(Binding { gate, policy })
}

impl Operation {
    /// Every operation, wired ones first.
    pub const ALL: [Operation; 32] = [
        Self::Init,
        Self::Destroy,
        Self::Getattr,
        Self::Access,
        Self::Readlink,
        Self::Open,
        Self::Read,
        Self::Flush,
        Self::Fsync,
        Self::Release,
        Self::Opendir,
        Self::Readdir,
        Self::Releasedir,
        Self::Fsyncdir,
        Self::Statfs,
        Self::Getxattr,
        Self::Listxattr,
        Self::Create,
        Self::Write,
        Self::Rename,
        Self::Unlink,
        Self::Mkdir,
        Self::Rmdir,
        Self::Mknod,
        Self::Chmod,
        Self::Chown,
        Self::Symlink,
        Self::Link,
        Self::Setxattr,
        Self::Removexattr,
        Self::Truncate,
        Self::Utimens,
    ];

    /// The operation's gate and policy, or `None` when it is not wired
    /// through the union engine.
    pub const fn binding(self) -> Option<Binding> {
        use Gate::*;
        use Policy::*;
        match self {
            Self::Init | Self::Destroy => bind(Exempt, FirstSuccess),
            Self::Getattr
            | Self::Readlink
            | Self::Open
            | Self::Opendir
            | Self::Releasedir
            | Self::Fsyncdir
            | Self::Statfs
            | Self::Getxattr
            | Self::Listxattr => bind(Exists, FirstSuccess),
            Self::Read | Self::Flush | Self::Fsync | Self::Release => bind(Handle, FirstSuccess),
            Self::Readdir => bind(Exists, UnionConcat),
            Self::Access => bind(Exists, RequireAllOrFail),
            Self::Create
            | Self::Write
            | Self::Rename
            | Self::Unlink
            | Self::Mkdir
            | Self::Rmdir
            | Self::Mknod
            | Self::Chmod
            | Self::Chown
            | Self::Symlink
            | Self::Link
            | Self::Setxattr
            | Self::Removexattr
            | Self::Truncate
            | Self::Utimens => None,
        }
    }

    pub const fn is_supported(self) -> bool {
        self.binding().is_some()
    }

    /// Gate of the operation. Unwired operations report [`Gate::Exists`].
    pub const fn gate(self) -> Gate {
        match self.binding() {
            Some(binding) => binding.gate,
            None => Gate::Exists,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Destroy => "destroy",
            Self::Getattr => "getattr",
            Self::Access => "access",
            Self::Readlink => "readlink",
            Self::Open => "open",
            Self::Read => "read",
            Self::Flush => "flush",
            Self::Fsync => "fsync",
            Self::Release => "release",
            Self::Opendir => "opendir",
            Self::Readdir => "readdir",
            Self::Releasedir => "releasedir",
            Self::Fsyncdir => "fsyncdir",
            Self::Statfs => "statfs",
            Self::Getxattr => "getxattr",
            Self::Listxattr => "listxattr",
            Self::Create => "create",
            Self::Write => "write",
            Self::Rename => "rename",
            Self::Unlink => "unlink",
            Self::Mkdir => "mkdir",
            Self::Rmdir => "rmdir",
            Self::Mknod => "mknod",
            Self::Chmod => "chmod",
            Self::Chown => "chown",
            Self::Symlink => "symlink",
            Self::Link => "link",
            Self::Setxattr => "setxattr",
            Self::Removexattr => "removexattr",
            Self::Truncate => "truncate",
            Self::Utimens => "utimens",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
