//! Framework de testes do kernel
//!
//! Suites registradas como arrays estáticos de `TestCase`, executadas no boot
//! quando a feature `self_test` está ativa.

/// Resultado de teste
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestResult {
    Pass,
    Fail,
    Skip,
}

/// Um caso de teste
pub struct TestCase<C: ?Sized> {
    pub name: &'static str,
    pub func: fn(&C) -> TestResult,
}

impl<C: ?Sized> TestCase<C> {
    pub const fn new(name: &'static str, func: fn(&C) -> TestResult) -> Self {
        Self { name, func }
    }
}

/// Contagem final de uma suite
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SuiteSummary {
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl SuiteSummary {
    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }
}

/// Executa suite de testes contra um contexto compartilhado
pub fn run_test_suite<C: ?Sized>(name: &str, ctx: &C, tests: &[TestCase<C>]) -> SuiteSummary {
    crate::kinfo!("=== Executando suite:");
    crate::logging::emit_str(name);
    crate::logging::emit_nl();

    let mut summary = SuiteSummary::default();

    for test in tests {
        match (test.func)(ctx) {
            TestResult::Pass => {
                crate::kok!(test.name);
                summary.passed += 1;
            }
            TestResult::Fail => {
                crate::kerror!("[FAIL]");
                crate::logging::emit_str(test.name);
                crate::logging::emit_nl();
                summary.failed += 1;
            }
            TestResult::Skip => {
                crate::kwarn!("[SKIP]");
                crate::logging::emit_str(test.name);
                crate::logging::emit_nl();
                summary.skipped += 1;
            }
        }
    }

    crate::kinfo!("Resultados: passed=", summary.passed as u64);
    crate::kinfo!("Resultados: failed=", summary.failed as u64);
    summary
}
