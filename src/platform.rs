const MOBILE_AGENTS: &[&str] = &[
    "android",
    "webos",
    "iphone",
    "ipad",
    "ipod",
    "blackberry",
    "iemobile",
    "opera mini",
];
const APPLE_AGENTS: &[&str] = &["iphone", "ipad", "ipod"];

/// What the host can do, detected once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Platform {
    pub mobile: bool,
    pub apple: bool,
    pub motion_supported: bool,
}

impl Platform {
    pub fn from_user_agent(user_agent: &str, motion_supported: bool) -> Self {
        let ua = user_agent.to_lowercase();
        Self {
            mobile: MOBILE_AGENTS.iter().any(|agent| ua.contains(agent)),
            apple: APPLE_AGENTS.iter().any(|agent| ua.contains(agent)),
            motion_supported,
        }
    }

    pub fn desktop() -> Self {
        Self { mobile: false, apple: false, motion_supported: false }
    }

    pub fn mobile_or_apple(&self) -> bool {
        self.mobile || self.apple
    }
}

/// How the scene reacts to the user. Chosen once by `InputStrategy::select`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputStrategy {
    /// Mobile with motion sensors: gravity follows the device tilt.
    Tilt,
    /// Desktop: drag, nudge and click-to-spawn with the pointer.
    Pointer,
    /// Mobile without motion sensors: nothing to listen to.
    Static,
}

impl InputStrategy {
    pub fn select(platform: &Platform) -> Self {
        match (platform.mobile_or_apple(), platform.motion_supported) {
            (false, _) => InputStrategy::Pointer,
            (true, true) => InputStrategy::Tilt,
            (true, false) => InputStrategy::Static,
        }
    }

    /// Touch devices start with the stack on screen, desktops drop it from above.
    pub fn is_mobile(self) -> bool {
        !matches!(self, InputStrategy::Pointer)
    }

    pub fn adds_mobile_roof(self) -> bool {
        matches!(self, InputStrategy::Tilt)
    }

    pub fn places_obstacle(self) -> bool {
        matches!(self, InputStrategy::Pointer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const IPHONE: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) AppleWebKit/605.1.15";
    const ANDROID: &str = "Mozilla/5.0 (Linux; Android 14; Pixel 8) AppleWebKit/537.36 Mobile Safari/537.36";
    const OPERA_MINI: &str = "Opera/9.80 (J2ME/MIDP; Opera Mini/9.80) Presto/2.12";
    const FIREFOX: &str = "Mozilla/5.0 (X11; Linux x86_64; rv:131.0) Gecko/20100101 Firefox/131.0";

    #[test]
    fn detects_user_agents() {
        let iphone = Platform::from_user_agent(IPHONE, true);
        assert!(iphone.mobile && iphone.apple);

        let android = Platform::from_user_agent(ANDROID, true);
        assert!(android.mobile && !android.apple);

        assert!(Platform::from_user_agent(OPERA_MINI, false).mobile);

        let firefox = Platform::from_user_agent(FIREFOX, false);
        assert!(!firefox.mobile_or_apple());
    }

    #[test]
    fn detects_every_listed_mobile_agent() {
        let mobile_only = [
            "Mozilla/5.0 (webOS/1.4.0; U; en-US) AppleWebKit/532.2 Pre/1.0",
            "Mozilla/5.0 (BlackBerry; U; BlackBerry 9900; en) AppleWebKit/534.11+ Mobile Safari/534.11+",
            "Mozilla/5.0 (compatible; MSIE 10.0; Windows Phone 8.0; Trident/6.0; IEMobile/10.0; ARM; Touch)",
        ];
        for ua in mobile_only {
            let platform = Platform::from_user_agent(ua, false);
            assert!(platform.mobile && !platform.apple, "{ua}");
        }

        let apple = [
            "Mozilla/5.0 (iPad; CPU OS 16_6 like Mac OS X) AppleWebKit/605.1.15 Mobile/15E148",
            "Mozilla/5.0 (iPod touch; CPU iPhone OS 12_5 like Mac OS X) AppleWebKit/605.1.15",
        ];
        for ua in apple {
            let platform = Platform::from_user_agent(ua, true);
            assert!(platform.mobile && platform.apple, "{ua}");
        }
    }

    #[test]
    fn selects_strategy_once_per_platform() {
        assert_eq!(InputStrategy::select(&Platform::desktop()), InputStrategy::Pointer);
        // desktop browsers often expose DeviceMotionEvent too
        assert_eq!(
            InputStrategy::select(&Platform::from_user_agent(FIREFOX, true)),
            InputStrategy::Pointer
        );
        assert_eq!(
            InputStrategy::select(&Platform::from_user_agent(IPHONE, true)),
            InputStrategy::Tilt
        );
        assert_eq!(
            InputStrategy::select(&Platform::from_user_agent(ANDROID, false)),
            InputStrategy::Static
        );
    }

    #[test]
    fn strategy_traits() {
        assert!(InputStrategy::Tilt.adds_mobile_roof());
        assert!(!InputStrategy::Static.adds_mobile_roof());
        assert!(InputStrategy::Pointer.places_obstacle());
        assert!(!InputStrategy::Tilt.places_obstacle());
        assert!(InputStrategy::Static.is_mobile());
        assert!(!InputStrategy::Pointer.is_mobile());
    }
}
