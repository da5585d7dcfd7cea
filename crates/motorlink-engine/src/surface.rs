//! Where desired parameter values come from.

use std::collections::BTreeMap;

use motorlink_protocol::ParameterSpec;

/// Desired parameter values by name, as read from a control surface.
pub type Observed = BTreeMap<String, i64>;

/// A source of desired parameter values, sampled once per tick.
pub trait ControlSurface {
    fn observe(&mut self) -> Observed;
}

impl<S: ControlSurface + ?Sized> ControlSurface for Box<S> {
    fn observe(&mut self) -> Observed {
        (**self).observe()
    }
}

/// Fixed values that only change when the owner sets them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticSurface {
    values: Observed,
}

impl StaticSurface {
    pub fn new(values: Observed) -> Self {
        Self { values }
    }

    /// The declared initial value of every parameter.
    pub fn from_initial(parameters: &[ParameterSpec]) -> Self {
        Self::new(
            parameters
                .iter()
                .map(|p| (p.name.clone(), i64::from(p.initial)))
                .collect(),
        )
    }

    pub fn set(&mut self, name: impl Into<String>, value: i64) {
        self.values.insert(name.into(), value);
    }

    pub fn values(&self) -> &Observed {
        &self.values
    }
}

impl ControlSurface for StaticSurface {
    fn observe(&mut self) -> Observed {
        self.values.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_initial_and_override() {
        let specs = vec![
            ParameterSpec {
                name: "K_spring".to_string(),
                index: 0,
                initial: 2,
                max: 3,
            },
            ParameterSpec {
                name: "Mode".to_string(),
                index: 4,
                initial: 0,
                max: 3,
            },
        ];
        let mut surface = StaticSurface::from_initial(&specs);
        surface.set("Mode", 1);

        let observed = surface.observe();
        assert_eq!(observed.get("K_spring"), Some(&2));
        assert_eq!(observed.get("Mode"), Some(&1));
        assert_eq!(observed.len(), 2);
    }
}
