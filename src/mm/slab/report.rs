//! # Relatório do kmalloc
//!
//! Snapshot somente-leitura do estado do alocador. Os valores são lidos
//! de contadores atômicos sem parar o alocador; o resultado é eventualmente
//! consistente.
//!
//! Formato do texto (exposto pelo VFS como arquivo):
//!
//! ```text
//! Region Usage: 3 / 15, Slab Usage: 0 2 1, cache hash load: 1%
//! Total bytes allocated: 8448
//! cache 1: size=128, slabcount=1
//! cache 2: size=64, slabcount=2
//! ```

use core::fmt::{self, Write};

use crate::mm::config::DIRECTORY_ENTRIES;

use super::stats::StatsSnapshot;

/// Uma linha por Cache
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheLine {
    pub object_size: usize,
    pub slab_count: usize,
}

#[derive(Clone)]
pub struct SlabReport {
    pub region_used: usize,
    pub region_total: usize,
    pub full_slabs: usize,
    pub partial_slabs: usize,
    pub empty_slabs: usize,
    pub hash_load: usize,
    pub total_allocated: usize,
    caches: [CacheLine; DIRECTORY_ENTRIES],
    ncaches: usize,
}

impl SlabReport {
    pub fn new(region_used: usize, region_total: usize, stats: StatsSnapshot, hash_load: usize) -> Self {
        Self {
            region_used,
            region_total,
            full_slabs: stats.full_slabs,
            partial_slabs: stats.partial_slabs,
            empty_slabs: stats.empty_slabs,
            hash_load,
            total_allocated: stats.total_allocated,
            caches: [CacheLine::default(); DIRECTORY_ENTRIES],
            ncaches: 0,
        }
    }

    pub fn push_cache(&mut self, object_size: usize, slab_count: usize) {
        if self.ncaches < self.caches.len() {
            self.caches[self.ncaches] = CacheLine {
                object_size,
                slab_count,
            };
            self.ncaches += 1;
        }
    }

    pub fn caches(&self) -> &[CacheLine] {
        &self.caches[..self.ncaches]
    }

    /// Ocupação da região ponderada por estado: cheio 100%, parcial 50%
    pub fn usage_percent(&self) -> usize {
        if self.region_total == 0 {
            return 0;
        }
        (self.full_slabs * 100 + self.partial_slabs * 50) / self.region_total
    }

    /// Copia o texto a partir de `offset` para `buf`. Retorna os bytes copiados.
    pub fn report_into(&self, offset: usize, buf: &mut [u8]) -> usize {
        let mut window = WindowWriter {
            skip: offset,
            buf,
            written: 0,
        };
        // WindowWriter nunca falha; texto além de buf é descartado
        let _ = write!(window, "{}", self);
        window.written
    }
}

impl fmt::Display for SlabReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Region Usage: {} / {}, Slab Usage: {} {} {}, cache hash load: {}%",
            self.region_used,
            self.region_total,
            self.full_slabs,
            self.partial_slabs,
            self.empty_slabs,
            self.hash_load
        )?;
        writeln!(f, "Total bytes allocated: {}", self.total_allocated)?;
        for (n, cache) in self.caches().iter().enumerate() {
            writeln!(
                f,
                "cache {}: size={}, slabcount={}",
                n + 1,
                cache.object_size,
                cache.slab_count
            )?;
        }
        Ok(())
    }
}

impl fmt::Debug for SlabReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlabReport")
            .field("region_used", &self.region_used)
            .field("region_total", &self.region_total)
            .field("full_slabs", &self.full_slabs)
            .field("partial_slabs", &self.partial_slabs)
            .field("empty_slabs", &self.empty_slabs)
            .field("total_allocated", &self.total_allocated)
            .field("caches", &self.caches())
            .finish()
    }
}

/// Janela `[skip, skip + buf.len())` sobre o texto formatado
struct WindowWriter<'a> {
    skip: usize,
    buf: &'a mut [u8],
    written: usize,
}

impl Write for WindowWriter<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let mut bytes = s.as_bytes();
        if self.skip >= bytes.len() {
            self.skip -= bytes.len();
            return Ok(());
        }
        bytes = &bytes[self.skip..];
        self.skip = 0;

        let room = self.buf.len() - self.written;
        let n = bytes.len().min(room);
        self.buf[self.written..self.written + n].copy_from_slice(&bytes[..n]);
        self.written += n;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SlabReport {
        let stats = StatsSnapshot {
            full_slabs: 1,
            partial_slabs: 2,
            empty_slabs: 0,
            total_allocated: 8448,
        };
        let mut report = SlabReport::new(3, 15, stats, 1);
        report.push_cache(128, 1);
        report.push_cache(64, 2);
        report
    }

    const TEXT: &str = "Region Usage: 3 / 15, Slab Usage: 1 2 0, cache hash load: 1%\n\
                        Total bytes allocated: 8448\n\
                        cache 1: size=128, slabcount=1\n\
                        cache 2: size=64, slabcount=2\n";

    #[test]
    fn test_display_format() {
        assert_eq!(format!("{}", sample()), TEXT);
    }

    #[test]
    fn test_usage_percent() {
        // (1*100 + 2*50) / 15
        assert_eq!(sample().usage_percent(), 13);
    }

    #[test]
    fn test_report_into_windows() {
        let report = sample();
        let mut buf = [0u8; 16];

        let n = report.report_into(0, &mut buf);
        assert_eq!(n, 16);
        assert_eq!(&buf[..n], &TEXT.as_bytes()[..16]);

        let n = report.report_into(TEXT.len() - 10, &mut buf);
        assert_eq!(n, 10);
        assert_eq!(&buf[..n], &TEXT.as_bytes()[TEXT.len() - 10..]);

        assert_eq!(report.report_into(TEXT.len(), &mut buf), 0);
    }
}
