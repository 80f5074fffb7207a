//! Terminal detection for choosing between rich and plain output

use std::io::IsTerminal;

/// Environment variables set by common CI systems
const CI_VARS: &[&str] = &[
    "CI",
    "GITHUB_ACTIONS",
    "GITLAB_CI",
    "CIRCLECI",
    "BUILDKITE",
    "JENKINS_URL",
    "TF_BUILD",
];

/// Decides how output is rendered
#[derive(Debug, Clone)]
pub struct UiContext {
    fancy: bool,
}

impl UiContext {
    /// Rich output on an interactive terminal, plain text otherwise
    pub fn detect() -> Self {
        Self {
            fancy: Self::detect_fancy(),
        }
    }

    /// Plain output regardless of the terminal (tests, `--format json`)
    pub fn plain() -> Self {
        Self { fancy: false }
    }

    /// Whether spinners, progress bars and colors should be used
    pub fn use_fancy_output(&self) -> bool {
        self.fancy
    }

    fn detect_fancy() -> bool {
        if !std::io::stdout().is_terminal() {
            return false;
        }
        if std::env::var_os("TERM").is_some_and(|term| term == "dumb") {
            return false;
        }
        !CI_VARS.iter().any(|var| std::env::var_os(var).is_some())
    }
}
