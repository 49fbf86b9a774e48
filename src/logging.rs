//! # Logging do kmalloc
//!
//! Macros `kerror!`, `kwarn!`, `kinfo!`, `kdebug!`, `ktrace!` e `kok!`,
//! filtradas em tempo de compilação pelas features `no_logs`, `log_error`,
//! `log_info`, `log_debug` e `log_trace`. Nível desligado vira `{}`.
//!
//! Sem `core::fmt` e sem alocação: cada linha é prefixo + literal e,
//! opcionalmente, um valor em hex de 16 dígitos.
//!
//! ```ignore
//! kinfo!("(Slab) Região em ", start);
//! kerror!("kfree: double free");
//! ```
//!
//! O kernel instala o destino (a serial) com [`install_sink`]. Até lá
//! as linhas são descartadas.

/// Destino dos bytes de log
pub trait LogSink: Sync {
    fn write_bytes(&self, bytes: &[u8]);
}

static SINK: spin::Once<&'static dyn LogSink> = spin::Once::new();

/// Só a primeira instalação vale
pub fn install_sink(sink: &'static dyn LogSink) {
    SINK.call_once(|| sink);
}

/// Nível de uma linha de log
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
    Ok,
}

impl Level {
    /// Prefixo colorido (ANSI) da linha
    pub const fn prefix(self) -> &'static str {
        match self {
            Level::Error => "\x1b[1;31m[ERRO]\x1b[0m ",
            Level::Warn => "\x1b[1;33m[WARN]\x1b[0m ",
            Level::Info => "\x1b[32m[INFO]\x1b[0m ",
            Level::Debug => "\x1b[36m[DEBG]\x1b[0m ",
            Level::Trace => "\x1b[35m[TRAC]\x1b[0m ",
            Level::Ok => "\x1b[32m[OK]\x1b[0m ",
        }
    }
}

#[inline]
fn emit_bytes(bytes: &[u8]) {
    if let Some(sink) = SINK.get() {
        sink.write_bytes(bytes);
    }
}

pub fn emit_str(s: &str) {
    emit_bytes(s.as_bytes());
}

pub fn emit_nl() {
    emit_bytes(b"\r\n");
}

/// `0x` + 16 dígitos maiúsculos
pub fn emit_hex(value: u64) {
    emit_bytes(&format_hex(value));
}

/// Uma linha completa. Ponto único chamado pelas macros.
#[inline(never)]
pub fn emit_line(level: Level, msg: &str, value: Option<u64>) {
    if SINK.get().is_none() {
        return;
    }
    emit_str(level.prefix());
    emit_str(msg);
    if let Some(value) = value {
        emit_hex(value);
    }
    emit_nl();
}

fn format_hex(value: u64) -> [u8; 18] {
    const DIGITS: &[u8; 16] = b"0123456789ABCDEF";
    let mut out = [b'0'; 18];
    out[1] = b'x';
    for (i, slot) in out[2..].iter_mut().enumerate() {
        let nibble = (value >> (60 - i * 4)) & 0xF;
        *slot = DIGITS[nibble as usize];
    }
    out
}

/// Expande para `emit_line`; as macros públicas só escolhem o nível.
#[doc(hidden)]
#[macro_export]
macro_rules! __klog_line {
    ($level:ident, $msg:expr) => {
        $crate::logging::emit_line($crate::logging::Level::$level, $msg, None)
    };
    ($level:ident, $msg:expr, $val:expr) => {
        $crate::logging::emit_line(
            $crate::logging::Level::$level,
            $msg,
            Some($val as u64),
        )
    };
}

// ERROR e WARN: ligados salvo com no_logs

#[cfg(not(feature = "no_logs"))]
#[macro_export]
macro_rules! kerror {
    ($($args:tt)+) => {{ $crate::__klog_line!(Error, $($args)+); }};
}

#[cfg(feature = "no_logs")]
#[macro_export]
macro_rules! kerror {
    ($($args:tt)*) => {{}};
}

#[cfg(not(feature = "no_logs"))]
#[macro_export]
macro_rules! kwarn {
    ($($args:tt)+) => {{ $crate::__klog_line!(Warn, $($args)+); }};
}

#[cfg(feature = "no_logs")]
#[macro_export]
macro_rules! kwarn {
    ($($args:tt)*) => {{}};
}

// INFO: desligado por log_error

#[cfg(not(any(feature = "no_logs", feature = "log_error")))]
#[macro_export]
macro_rules! kinfo {
    ($($args:tt)+) => {{ $crate::__klog_line!(Info, $($args)+); }};
}

#[cfg(any(feature = "no_logs", feature = "log_error"))]
#[macro_export]
macro_rules! kinfo {
    ($($args:tt)*) => {{}};
}

// DEBUG: só com log_debug ou log_trace

#[cfg(all(
    not(feature = "no_logs"),
    any(feature = "log_trace", feature = "log_debug")
))]
#[macro_export]
macro_rules! kdebug {
    ($($args:tt)+) => {{ $crate::__klog_line!(Debug, $($args)+); }};
}

#[cfg(not(all(
    not(feature = "no_logs"),
    any(feature = "log_trace", feature = "log_debug")
)))]
#[macro_export]
macro_rules! kdebug {
    ($($args:tt)*) => {{}};
}

#[cfg(all(not(feature = "no_logs"), feature = "log_trace"))]
#[macro_export]
macro_rules! ktrace {
    ($($args:tt)+) => {{ $crate::__klog_line!(Trace, $($args)+); }};
}

#[cfg(not(all(not(feature = "no_logs"), feature = "log_trace")))]
#[macro_export]
macro_rules! ktrace {
    ($($args:tt)*) => {{}};
}

/// Sucesso de uma etapa (init, self-test)
#[cfg(not(feature = "no_logs"))]
#[macro_export]
macro_rules! kok {
    ($msg:expr) => {{ $crate::__klog_line!(Ok, $msg); }};
}

#[cfg(feature = "no_logs")]
#[macro_export]
macro_rules! kok {
    ($($args:tt)*) => {{}};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_hex() {
        assert_eq!(&format_hex(0), b"0x0000000000000000");
        assert_eq!(&format_hex(0xADA5_A54B), b"0x00000000ADA5A54B");
        assert_eq!(&format_hex(u64::MAX), b"0xFFFFFFFFFFFFFFFF");
    }

    #[test]
    fn test_prefixes_are_distinct() {
        assert!(Level::Error.prefix().contains("[ERRO]"));
        assert!(Level::Ok.prefix().contains("[OK]"));
        assert_ne!(Level::Debug.prefix(), Level::Trace.prefix());
    }

    #[test]
    fn test_macros_without_sink() {
        // Sem sink instalado as linhas são descartadas
        crate::kerror!("(Test) erro=", 1u64);
        crate::kwarn!("(Test) aviso");
        crate::kinfo!("(Test) info");
        crate::kdebug!("(Test) debug=", 2usize);
        crate::ktrace!("(Test) trace");
        crate::kok!("(Test) ok");
    }
}
