//! The 9P2000 error catalog and the crate's `Error` type.
//!
//! Unlike 9P2000.L/Linux 9P, classic 9P2000 has no numeric errno on the
//! wire — a failed operation carries only a human-readable `ename` string in
//! `Rerror`. [`Proto`] enumerates the named errors a handler can return;
//! anything else is an opaque I/O error that gets remapped to [`Proto::Io`]
//! before it reaches the client (see [`Error::catalog_string`]).

use std::fmt;
use std::io;

/// One of the catalog's named 9P errors.
///
/// Strings are drawn from Plan 9's `lib9p/srv.c` and the Linux 9P client's
/// error table, matching what real 9P clients expect to see.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[non_exhaustive]
pub enum Proto {
    BadAttach,
    BadOffset,
    BadCount,
    Botch,
    CreateNonDir,
    DupFid,
    DupTag,
    NoCreate,
    NoRemove,
    NoStat,
    NotFound,
    NoWrite,
    NoWstat,
    Perm,
    UnknownFid,
    BadDir,
    WalkNoDir,

    BadFd,
    BadFid,
    FidInUse,

    Auth,

    CrossDevice,
    Deadlock,
    DirNotEmpty,

    Exists,
    InUse,
    TooBig,

    IllegalMode,
    IllegalName,
    IllegalOffset,
    IllegalSeek,

    InProgress,
    Interrupted,
    InvalidArg,
    Io,

    BadMessage,
    MessageTooLong,
    NoMessage,

    ConnAbort,
    Connected,
    ConnRefused,
    ConnReset,
    HostDown,
    NetDown,
    NetReset,
    NetUnreachable,
    NoNet,
    NoRoute,
    NotConnected,

    NoDevice,
    NoDeviceOrAddr,
    NoLink,
    NoLock,
    NoMem,
    NoPackage,

    BrokenPipe,
    BadAddr,
    Busy,
    Comm,
    NoBufferSpace,
    NoData,
    NoSpace,

    AlreadyInProgress,
    Shutdown,
    Timeout,

    IsDir,
    IsNamed,
    NotBlockDev,
    NotDir,
    NotSock,

    NotImplemented,
    OpNoSupported,

    OutOfRange,
    Range,
    Quota,
    ReadOnly,
    ReadOnlyFs,
    Remote,
    RemoteIO,
    Removed,
    StreamPipe,

    NoProto,
    ProtoNoSupport,
    ProtoFamilyNoSupport,
    SockNoSupported,

    TooManyArgs,
    TooManyFiles,
    TooManyLevels,
    TooManyLinks,
    TooManyOpenFiles,
    TooManyUsers,

    TempUnavailable,

    UnknownGroup,
    UnknownOrBadFid,
    UnknownUser,
}

impl Proto {
    /// The canonical wire string sent back in `Rerror.ename`.
    pub const fn message(self) -> &'static str {
        use Proto::*;
        match self {
            BadAttach => "unknown specifier in attach",
            BadOffset => "bad offset",
            BadCount => "bad count",
            Botch => "9P protocol botch",
            CreateNonDir => "create in non-directory",
            DupFid => "duplicate fid",
            DupTag => "duplicate tag",
            NoCreate => "create prohibited",
            NoRemove => "remove prohibited",
            NoStat => "stat prohibited",
            NotFound => "file not found",
            NoWrite => "write prohibited",
            NoWstat => "wstat prohibited",
            Perm => "permission denied",
            UnknownFid => "unknown fid",
            BadDir => "bad directory in wstat",
            WalkNoDir => "walk in non-directory",

            BadFd => "File descriptor in bad state",
            BadFid => "bad use of fid",
            FidInUse => "fid already in use",

            Auth => "authentication failed",

            CrossDevice => "Invalid cross-device link",
            Deadlock => "Resource deadlock avoided",
            DirNotEmpty => "directory is not empty",

            Exists => "file exists",
            InUse => "file in use",
            TooBig => "file too big",

            IllegalMode => "illegal mode",
            IllegalName => "illegal name",
            IllegalOffset => "illegal offset",
            IllegalSeek => "Illegal seek",

            InProgress => "Operation now in progress",
            Interrupted => "Interrupted system call",
            InvalidArg => "Invalid argument",
            Io => "i/o error",

            BadMessage => "Bad message",
            MessageTooLong => "Message too long",
            NoMessage => "No message of desired type",

            ConnAbort => "Software caused connection abort",
            Connected => "Transport endpoint is already connected",
            ConnRefused => "Connection refused",
            ConnReset => "Connection reset by peer",
            HostDown => "Host is down",
            NetDown => "Network is down",
            NetReset => "Network dropped connection on reset",
            NetUnreachable => "Network is unreachable",
            NoNet => "Machine is not on the network",
            NoRoute => "No route to host",
            NotConnected => "Transport endpoint is not connected",

            NoDevice => "No such device",
            NoDeviceOrAddr => "No such device or address",
            NoLink => "Link has been severed",
            NoLock => "No locks available",
            NoMem => "Cannot allocate memory",
            NoPackage => "Package not installed",

            BrokenPipe => "Broken pipe",
            BadAddr => "Bad address",
            Busy => "Device or resource busy",
            Comm => "Communication error on send",
            NoBufferSpace => "No buffer space available",
            NoData => "No data available",
            NoSpace => "file system is full",

            AlreadyInProgress => "Operation already in progress",
            Shutdown => "Cannot send after transport endpoint shutdown",
            Timeout => "Connection timed out",

            IsDir => "Is a directory",
            IsNamed => "Is a named type file",
            NotBlockDev => "Block device required",
            NotDir => "not a directory",
            NotSock => "Socket operation on non-socket",

            NotImplemented => "Function not implemented",
            OpNoSupported => "Operation not supported",

            OutOfRange => "Numerical argument out of domain",
            Range => "Numerical result out of range",
            Quota => "Disk quota exceeded",
            ReadOnly => "file is read only",
            ReadOnlyFs => "read only file system",
            Remote => "Object is remote",
            RemoteIO => "Remote I/O error",
            Removed => "file has been removed",
            StreamPipe => "Streams pipe error",

            NoProto => "Protocol not available",
            ProtoNoSupport => "Protocol not supported",
            ProtoFamilyNoSupport => "Protocol family not supported",
            SockNoSupported => "Socket type not supported",

            TooManyArgs => "Argument list too long",
            TooManyFiles => "Too many open files",
            TooManyLevels => "Too many levels of symbolic links",
            TooManyLinks => "Too many links",
            TooManyOpenFiles => "Too many open files in system",
            TooManyUsers => "Too many users",

            TempUnavailable => "Resource temporarily unavailable",

            UnknownGroup => "unknown group",
            UnknownOrBadFid => "fid unknown or out of range",
            UnknownUser => "unknown user",
        }
    }
}

impl fmt::Display for Proto {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// The crate's error type: either a cataloged protocol error (sent to the
/// client verbatim) or an opaque I/O error (remapped to [`Proto::Io`] before
/// it reaches the wire, but kept around with its real detail for logging).
#[derive(Debug)]
pub enum Error {
    Proto(Proto),
    Io(io::Error),
}

impl Error {
    /// The string placed in `Rerror.ename` for this error.
    pub fn catalog_string(&self) -> &'static str {
        match self {
            Error::Proto(p) => p.message(),
            Error::Io(_) => Proto::Io.message(),
        }
    }

    /// Whether this error is in the named catalog (as opposed to an opaque
    /// I/O failure that gets remapped and logged under `DebugUnknownErrors`).
    pub fn is_cataloged(&self) -> bool {
        matches!(self, Error::Proto(_))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Proto(p) => p.fmt(f),
            Error::Io(e) => e.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Proto(_) => None,
            Error::Io(e) => Some(e),
        }
    }
}

impl From<Proto> for Error {
    fn from(p: Proto) -> Self {
        Error::Proto(p)
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}

/// Shorthand for constructing a one-off [`io::Error`].
#[macro_export]
macro_rules! io_err {
    ($kind:ident, $msg:expr) => {
        ::std::io::Error::new(::std::io::ErrorKind::$kind, $msg)
    };
}

/// Shorthand for returning a `Result::Err` converted via `From`.
#[macro_export]
macro_rules! res {
    ($err:expr) => {
        Err(::std::convert::From::from($err))
    };
}

pub type Result<T> = ::std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_and_out_of_range_are_distinct() {
        assert_ne!(Proto::Range.message(), Proto::OutOfRange.message());
        assert_eq!(Proto::Range.message(), "Numerical result out of range");
    }
}
