// Static geographic tables: regions, sample states, representative ZIP codes
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Geography {
    pub fallback_zip_codes: Vec<String>,
    #[serde(default)]
    pub key_states: Vec<String>,
    pub regions: Vec<Region>,
    #[serde(default)]
    pub states: Vec<StateZipCodes>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Region {
    pub name: String,
    pub states: Vec<String>,
    #[serde(default)]
    pub national_sample: Vec<String>,
    #[serde(default)]
    pub refresh_sample: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StateZipCodes {
    pub code: String,
    pub zip_codes: Vec<String>,
}

/// Which roster of sample states to pull regional averages from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleRoster {
    /// Served by the national averages endpoint.
    National,
    /// Pulled by the scheduled refresh.
    Refresh,
}

impl Region {
    fn sample(&self, roster: SampleRoster) -> &[String] {
        match roster {
            SampleRoster::National => &self.national_sample,
            SampleRoster::Refresh => &self.refresh_sample,
        }
    }
}

impl Geography {
    pub fn region_names(&self) -> impl Iterator<Item = &str> {
        self.regions.iter().map(|region| region.name.as_str())
    }

    /// Sampled states first, so a state sampled for a region resolves to it
    /// even when it is not one of the region's members.
    pub fn region_of_state(&self, state: &str) -> Option<&str> {
        let state = state.trim();
        let sampled = self.regions.iter().find(|region| {
            region
                .national_sample
                .iter()
                .chain(&region.refresh_sample)
                .any(|s| s.eq_ignore_ascii_case(state))
        });
        sampled
            .or_else(|| {
                self.regions
                    .iter()
                    .find(|region| region.states.iter().any(|s| s.eq_ignore_ascii_case(state)))
            })
            .map(|region| region.name.as_str())
    }

    /// Canonical spelling of a region name, if it is one.
    pub fn region_name(&self, name: &str) -> Option<&str> {
        self.regions
            .iter()
            .find(|region| region.name.eq_ignore_ascii_case(name))
            .map(|region| region.name.as_str())
    }

    /// States sampled for `roster`, in table order.
    pub fn sample_states(&self, roster: SampleRoster) -> Vec<&str> {
        self.regions
            .iter()
            .flat_map(|region| region.sample(roster))
            .map(String::as_str)
            .collect()
    }

    pub fn zip_codes_for(&self, state: &str) -> &[String] {
        self.states
            .iter()
            .find(|entry| entry.code.eq_ignore_ascii_case(state))
            .map(|entry| entry.zip_codes.as_slice())
            .unwrap_or(self.fallback_zip_codes.as_slice())
    }
}
