//! Autopilot configuration
//!
//! Persisted in LocalStorage as JSON. Missing fields take defaults, so older
//! saved configs keep loading after new options are added.

use serde::{Deserialize, Serialize};

/// One way of finding an element
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "by", content = "value", rename_all = "lowercase")]
pub enum Locator {
    /// `document.getElementById`
    Id(String),
    /// `document.querySelector`
    Css(String),
}

impl Locator {
    pub fn id(id: &str) -> Self {
        Locator::Id(id.to_string())
    }

    pub fn css(selector: &str) -> Self {
        Locator::Css(selector.to_string())
    }
}

/// Locators tried in order; the first match wins
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocatorChain(pub Vec<Locator>);

impl LocatorChain {
    pub fn new(locators: impl IntoIterator<Item = Locator>) -> Self {
        Self(locators.into_iter().collect())
    }

    /// First locator for which `find` yields something
    pub fn resolve<T>(&self, mut find: impl FnMut(&Locator) -> Option<T>) -> Option<T> {
        self.0.iter().find_map(|locator| find(locator))
    }
}

/// Where the page keeps the things we read and press
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Selectors {
    pub canvas: LocatorChain,
    pub start: LocatorChain,
    pub pause: LocatorChain,
    pub bricks: LocatorChain,
    pub chests: LocatorChain,
    pub wallet: LocatorChain,
}

impl Default for Selectors {
    fn default() -> Self {
        Self {
            canvas: LocatorChain::new([
                Locator::id("game-canvas"),
                Locator::css("canvas#game-canvas"),
                Locator::css("canvas[id*=\"game\"]"),
                Locator::css("canvas"),
            ]),
            start: LocatorChain::new([
                Locator::id("btn-start"),
                Locator::css("button#btn-start"),
                Locator::css("button[id*=\"start\"]:not([id*=\"auto\"])"),
                Locator::css(".btn-start"),
                Locator::css("[class*=\"start-btn\"]"),
                Locator::css("button.start"),
            ]),
            pause: LocatorChain::new([
                Locator::id("btn-pause"),
                Locator::css("button#btn-pause"),
                Locator::css("button[id*=\"pause\"]"),
                Locator::css(".btn-pause"),
                Locator::css("[class*=\"pause\"]"),
            ]),
            bricks: LocatorChain::new([Locator::id("stat-normal")]),
            chests: LocatorChain::new([Locator::id("stat-chest")]),
            wallet: LocatorChain::new([Locator::css("#nav-wallet, .wallet-balance, [data-wallet]")]),
        }
    }
}

/// Loop cadences, dwells and cooldowns, all in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timing {
    /// Ball/paddle pixel sampling period
    pub sample_interval_ms: f64,
    /// Brick-region sampling period
    pub region_interval_ms: f64,
    /// Minimum gap between start clicks
    pub start_cooldown_ms: f64,
    /// Delay from start click to the launch key
    pub launch_delay_ms: f64,
    /// Ball parked on the paddle this long gets launched
    pub stuck_dwell_ms: f64,
    /// Ball unseen this long counts as lost
    pub lost_timeout_ms: f64,
    /// Ball motionless near the bottom this long counts as wedged
    pub wedged_timeout_ms: f64,
    /// Minimum gap between rescues
    pub rescue_cooldown_ms: f64,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            sample_interval_ms: 80.0,
            region_interval_ms: 800.0,
            start_cooldown_ms: 3000.0,
            launch_delay_ms: 1500.0,
            stuck_dwell_ms: 2000.0,
            lost_timeout_ms: 1000.0,
            wedged_timeout_ms: 900.0,
            rescue_cooldown_ms: 1500.0,
        }
    }
}

/// Autopilot settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PilotConfig {
    /// Press start automatically between rounds
    pub auto_start: bool,
    /// Scan-mode sweep speed (px per frame, 1-20)
    pub scan_speed: f32,
    /// Stop after this many started games (0 = unlimited)
    pub max_games: u32,
    /// Stop when the wallet drops below this (0 = no floor)
    pub min_balance: f64,
    /// Pull toward the brick region, percent of the distance (0-100)
    pub brick_bias: u8,
    /// Random aim offset, percent of the paddle width (0-100)
    pub jitter_scale: u8,
    /// `window` property holding the authoritative game state, if any
    pub state_global: String,
    pub timing: Timing,
    pub selectors: Selectors,
}

impl Default for PilotConfig {
    fn default() -> Self {
        Self {
            auto_start: true,
            scan_speed: 8.0,
            max_games: 0,
            min_balance: 0.0,
            brick_bias: 30,
            jitter_scale: 35,
            state_global: "__brickGameState".to_string(),
            timing: Timing::default(),
            selectors: Selectors::default(),
        }
    }
}

impl PilotConfig {
    /// Clamp every field into its valid range
    pub fn sanitized(mut self) -> Self {
        self.scan_speed = if self.scan_speed.is_finite() {
            self.scan_speed.clamp(1.0, 20.0)
        } else {
            Self::default().scan_speed
        };
        self.min_balance = if self.min_balance.is_finite() {
            self.min_balance.max(0.0)
        } else {
            0.0
        };
        self.brick_bias = self.brick_bias.min(100);
        self.jitter_scale = self.jitter_scale.min(100);

        let defaults = Timing::default();
        let t = &mut self.timing;
        for (value, default) in [
            (&mut t.sample_interval_ms, defaults.sample_interval_ms),
            (&mut t.region_interval_ms, defaults.region_interval_ms),
            (&mut t.start_cooldown_ms, defaults.start_cooldown_ms),
            (&mut t.launch_delay_ms, defaults.launch_delay_ms),
            (&mut t.stuck_dwell_ms, defaults.stuck_dwell_ms),
            (&mut t.lost_timeout_ms, defaults.lost_timeout_ms),
            (&mut t.wedged_timeout_ms, defaults.wedged_timeout_ms),
            (&mut t.rescue_cooldown_ms, defaults.rescue_cooldown_ms),
        ] {
            if !value.is_finite() || *value < 0.0 {
                *value = default;
            }
        }
        self
    }

    /// Brick bias as a 0.0-1.0 weight
    pub fn bias_weight(&self) -> f32 {
        self.brick_bias.min(100) as f32 / 100.0
    }

    /// Jitter scale as a 0.0-1.0 ratio
    pub fn jitter_ratio(&self) -> f32 {
        self.jitter_scale.min(100) as f32 / 100.0
    }

    /// Parse a saved config, falling back to defaults on bad JSON
    pub fn from_json(json: &str) -> Self {
        match serde_json::from_str::<Self>(json) {
            Ok(config) => config.sanitized(),
            Err(e) => {
                log::warn!("Ignoring saved config: {}", e);
                Self::default()
            }
        }
    }

    /// LocalStorage key
    #[allow(dead_code)]
    const STORAGE_KEY: &'static str = "brick_autopilot_config";

    /// Load config from LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn load() -> Self {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(Some(json)) = storage.get_item(Self::STORAGE_KEY) {
                log::info!("Loaded config from LocalStorage");
                return Self::from_json(&json);
            }
        }

        log::info!("Using default config");
        Self::default()
    }

    /// Save config to LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn save(&self) {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(json) = serde_json::to_string(self) {
                let _ = storage.set_item(Self::STORAGE_KEY, &json);
                log::info!("Config saved");
            }
        }
    }

    /// Native stubs
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load() -> Self {
        Self::default()
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn save(&self) {
        // No-op for native
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = PilotConfig::from_json(r#"{"max_games": 5, "timing": {"lost_timeout_ms": 1200}}"#);
        assert_eq!(config.max_games, 5);
        assert!(config.auto_start);
        assert_eq!(config.timing.lost_timeout_ms, 1200.0);
        assert_eq!(config.timing.sample_interval_ms, 80.0);
        assert_eq!(config.selectors, Selectors::default());
    }

    #[test]
    fn test_bad_json_gives_defaults() {
        assert_eq!(PilotConfig::from_json("{oops"), PilotConfig::default());
    }

    #[test]
    fn test_sanitized_clamps() {
        let config = PilotConfig {
            scan_speed: 99.0,
            min_balance: -5.0,
            brick_bias: 250,
            jitter_scale: 101,
            timing: Timing {
                rescue_cooldown_ms: -1.0,
                ..Timing::default()
            },
            ..PilotConfig::default()
        }
        .sanitized();

        assert_eq!(config.scan_speed, 20.0);
        assert_eq!(config.min_balance, 0.0);
        assert_eq!(config.brick_bias, 100);
        assert_eq!(config.jitter_scale, 100);
        assert_eq!(config.timing.rescue_cooldown_ms, 1500.0);
    }

    #[test]
    fn test_locator_roundtrip_format() {
        let json = serde_json::to_string(&LocatorChain::new([Locator::id("a"), Locator::css(".b")])).unwrap();
        assert_eq!(json, r#"[{"by":"id","value":"a"},{"by":"css","value":".b"}]"#);
    }

    #[test]
    fn test_chain_resolves_first_match() {
        let chain = LocatorChain::new([Locator::id("missing"), Locator::css(".hit"), Locator::css(".later")]);
        let found = chain.resolve(|l| match l {
            Locator::Css(s) => Some(s.clone()),
            Locator::Id(_) => None,
        });
        assert_eq!(found.as_deref(), Some(".hit"));
    }

    #[test]
    fn test_weights() {
        let config = PilotConfig::default();
        assert!((config.bias_weight() - 0.3).abs() < 1e-6);
        assert!((config.jitter_ratio() - 0.35).abs() < 1e-6);
    }
}
