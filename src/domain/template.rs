//! Composition templates with `%HOOK%` placeholders.
//!
//! Built-in templates target the runtime header shipped in `include/`.
//! Either template can be replaced by a file named in the configuration.

use crate::domain::action::abi;
use crate::domain::error::DtbuildError;
use crate::ports::source_port::SourcePort;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hook {
    Includes,
    AlgorithmName,
    IndicatorDefine,
    IndicatorDeclare,
    IndicatorData,
    IndicatorCount,
    AlgorithmScript,
    IndicatorClass,
    IndicatorLabel,
    CalculateScript,
}

impl Hook {
    pub const ALL: [Hook; 10] = [
        Hook::Includes,
        Hook::AlgorithmName,
        Hook::IndicatorDefine,
        Hook::IndicatorDeclare,
        Hook::IndicatorData,
        Hook::IndicatorCount,
        Hook::AlgorithmScript,
        Hook::IndicatorClass,
        Hook::IndicatorLabel,
        Hook::CalculateScript,
    ];

    pub fn placeholder(self) -> &'static str {
        match self {
            Hook::Includes => "%INCLUDES%",
            Hook::AlgorithmName => "%ALGORITHM_NAME%",
            Hook::IndicatorDefine => "%INDICATOR_DEFINE%",
            Hook::IndicatorDeclare => "%INDICATOR_DECLARE%",
            Hook::IndicatorData => "%INDICATOR_DATA%",
            Hook::IndicatorCount => "%INDICATOR_COUNT%",
            Hook::AlgorithmScript => "%ALGORITHM_SCRIPT%",
            Hook::IndicatorClass => "%INDICATOR_CLASS%",
            Hook::IndicatorLabel => "%INDICATOR_LABEL%",
            Hook::CalculateScript => "%CALCULATE_SCRIPT%",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    text: String,
}

impl Template {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn contains(&self, hook: Hook) -> bool {
        self.text.contains(hook.placeholder())
    }

    /// Replace every placeholder in one pass. Hooks without a value become
    /// empty; substituted text is never scanned for placeholders again.
    pub fn substitute(&self, values: &[(Hook, &str)]) -> String {
        let mut out = String::with_capacity(self.text.len());
        let mut rest = self.text.as_str();

        while let Some(start) = rest.find('%') {
            out.push_str(&rest[..start]);
            let tail = &rest[start..];
            match Hook::ALL.iter().find(|h| tail.starts_with(h.placeholder())) {
                Some(&hook) => {
                    let value = values
                        .iter()
                        .find(|(h, _)| *h == hook)
                        .map(|(_, v)| *v)
                        .unwrap_or_default();
                    out.push_str(value);
                    rest = &tail[hook.placeholder().len()..];
                }
                None => {
                    out.push('%');
                    rest = &tail[1..];
                }
            }
        }
        out.push_str(rest);
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Templates {
    pub algorithm: Template,
    pub indicator: Template,
}

impl Templates {
    pub fn builtin() -> Self {
        Self {
            algorithm: Template::new(ALGORITHM_TEMPLATE),
            indicator: Template::new(INDICATOR_TEMPLATE),
        }
    }

    /// Built-in templates, with either one replaced by the file at the given
    /// path.
    pub fn load(
        algorithm: Option<&Path>,
        indicator: Option<&Path>,
        sources: &dyn SourcePort,
    ) -> Result<Self, DtbuildError> {
        let mut templates = Self::builtin();
        if let Some(path) = algorithm {
            templates.algorithm = Template::new(sources.read_source(path)?);
            for symbol in [abi::RANGES_SIZE, abi::ALGORITHM] {
                if !templates.algorithm.text().contains(symbol) {
                    log::warn!(
                        "algorithm template {} does not mention '{symbol}'",
                        path.display()
                    );
                }
            }
        }
        if let Some(path) = indicator {
            templates.indicator = Template::new(sources.read_source(path)?);
        }
        Ok(templates)
    }
}

/// Indent every non-empty line of `text` by `depth` tabs.
pub fn indent(text: &str, depth: usize) -> String {
    let prefix = "\t".repeat(depth);
    text.lines()
        .map(|line| {
            if line.is_empty() {
                String::new()
            } else {
                format!("{prefix}{line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

const ALGORITHM_TEMPLATE: &str = r#"// %ALGORITHM_NAME%: generated by dtbuild
#include <dtbuild/algorithm.h>
%INCLUDES%

#define INDICATORS %INDICATOR_COUNT%

using namespace dtbuild;

extern "C" int ranges_size() { return INDICATORS + 1; }

%INDICATOR_DEFINE%

extern "C" void algorithm(AlgorithmData& out)
{
	init_algorithm(out, "%ALGORITHM_NAME%", INDICATORS + 1);
%INDICATOR_DECLARE%
%INDICATOR_DATA%
	const int action = [&]() -> int
	{
%ALGORITHM_SCRIPT%
		return ACTION_NOTHING;
	}();
	out.set_action(action);
}
"#;

const INDICATOR_TEMPLATE: &str = r#"%INCLUDES%
class %INDICATOR_CLASS% : public IndicatorKind
{
public:
	%INDICATOR_CLASS%(std::initializer_list<double> init) : IndicatorKind("%INDICATOR_CLASS%", "%INDICATOR_LABEL%", init) {}

	void calculate(Indicator& data, const CandleSet& candles, int range) const override
	{
		const std::vector<double>& args = this->args();
%CALCULATE_SCRIPT%
	}
};
"#;
