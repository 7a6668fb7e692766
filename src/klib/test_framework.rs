//! Framework de testes do kernel
//!
//! Suites de self test (feature `self_test`) rodam dentro do kernel, sem o
//! harness do `cargo test`. Cada caso retorna um `TestResult`.

/// Resultado de teste
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestResult {
    Pass,
    Fail,
    Skip,
}

/// Um caso de teste
pub struct TestCase {
    pub name: &'static str,
    pub func: fn() -> TestResult,
}

impl TestCase {
    pub const fn new(name: &'static str, func: fn() -> TestResult) -> Self {
        Self { name, func }
    }
}

/// Totais de uma suite
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SuiteReport {
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl SuiteReport {
    pub fn ok(&self) -> bool {
        self.failed == 0
    }
}

/// Executa suite de testes
pub fn run_test_suite(name: &str, tests: &[TestCase]) -> SuiteReport {
    crate::klog!("=== Suite: ");
    crate::klog!(name);
    crate::knl!();

    let mut report = SuiteReport::default();

    for test in tests {
        match (test.func)() {
            TestResult::Pass => {
                crate::kok!(test.name);
                report.passed += 1;
            }
            TestResult::Fail => {
                crate::kfail!(test.name);
                report.failed += 1;
            }
            TestResult::Skip => {
                crate::kwarn!("[SKIP] casos pulados até agora=", report.skipped as u64 + 1);
                report.skipped += 1;
            }
        }
    }

    crate::kinfo!("Resultados: passed=", report.passed as u64);
    if report.failed > 0 {
        crate::kerror!("Resultados: failed=", report.failed as u64);
    }
    report
}
