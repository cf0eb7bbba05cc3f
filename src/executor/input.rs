// adb `input` argument builders. Pure so they can be checked without a device.
use crate::config::AndroidConfig;

pub const KEYCODE_ENTER: &str = "66";
pub const KEYCODE_BACK: &str = "KEYCODE_BACK";
pub const KEYCODE_HOME: &str = "KEYCODE_HOME";
pub const KEYCODE_VOLUME_UP: &str = "KEYCODE_VOLUME_UP";
pub const KEYCODE_VOLUME_DOWN: &str = "KEYCODE_VOLUME_DOWN";

fn shell_input(verb: &str, rest: impl IntoIterator<Item = String>) -> Vec<String> {
    ["shell", "input", verb]
        .into_iter()
        .map(String::from)
        .chain(rest)
        .collect()
}

pub fn tap(x: i32, y: i32) -> Vec<String> {
    shell_input("tap", [x.to_string(), y.to_string()])
}

pub fn swipe(from: (i32, i32), to: (i32, i32), duration_ms: Option<u32>) -> Vec<String> {
    let mut args = vec![
        from.0.to_string(),
        from.1.to_string(),
        to.0.to_string(),
        to.1.to_string(),
    ];
    if let Some(ms) = duration_ms {
        args.push(ms.to_string());
    }
    shell_input("swipe", args)
}

/// Zero-length swipe held for `duration_ms`.
pub fn long_press(x: i32, y: i32, duration_ms: u32) -> Vec<String> {
    swipe((x, y), (x, y), Some(duration_ms))
}

pub fn keyevent(code: &str) -> Vec<String> {
    shell_input("keyevent", [code.to_string()])
}

/// `text` must already be sanitized.
pub fn text(sanitized: String) -> Vec<String> {
    shell_input("text", [sanitized])
}

pub fn screencap() -> Vec<String> {
    ["exec-out", "screencap", "-p"].into_iter().map(String::from).collect()
}

/// Direction of a swipe gesture through the configured screen centre.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gesture {
    Left,
    Right,
    Up,
    Down,
}

/// Endpoints of `gesture`. Vertical gestures use `scroll_distance`,
/// horizontal ones `swipe_distance`.
pub fn gesture(cfg: &AndroidConfig, gesture: Gesture) -> Vec<String> {
    let (cx, cy) = (cfg.screen_center_x, cfg.screen_center_y);
    let half_v = cfg.scroll_distance / 2;
    let half_h = cfg.swipe_distance / 2;
    let (from, to) = match gesture {
        Gesture::Left => ((cx + half_h, cy), (cx - half_h, cy)),
        Gesture::Right => ((cx - half_h, cy), (cx + half_h, cy)),
        Gesture::Up => ((cx, cy + half_v), (cx, cy - half_v)),
        Gesture::Down => ((cx, cy - half_v), (cx, cy + half_v)),
    };
    swipe(from, to, None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tap_and_long_press_arguments() {
        assert_eq!(tap(100, 200), ["shell", "input", "tap", "100", "200"]);
        assert_eq!(
            long_press(5, 6, 1000),
            ["shell", "input", "swipe", "5", "6", "5", "6", "1000"]
        );
    }

    #[test]
    fn gestures_pass_through_the_configured_centre() {
        let cfg = AndroidConfig::default();
        assert_eq!(
            gesture(&cfg, Gesture::Up),
            ["shell", "input", "swipe", "500", "1500", "500", "500"]
        );
        assert_eq!(
            gesture(&cfg, Gesture::Down),
            ["shell", "input", "swipe", "500", "500", "500", "1500"]
        );
        assert_eq!(
            gesture(&cfg, Gesture::Left),
            ["shell", "input", "swipe", "800", "1000", "200", "1000"]
        );
        assert_eq!(
            gesture(&cfg, Gesture::Right),
            ["shell", "input", "swipe", "200", "1000", "800", "1000"]
        );
    }
}
