use std::time::Duration;

/// The parts of robots.txt the crawler honours.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Robots {
    /// Crawl-delay of the `*` group
    pub crawl_delay: Option<Duration>,
    pub sitemaps: Vec<String>,
}

/// Minimal parser for the `*` group.
///
/// Consecutive `User-agent` lines share the rules that follow them, so a
/// group naming both `*` and another agent applies to us.
pub fn parse_robots(txt: &str) -> Robots {
    let mut robots = Robots::default();
    let mut active = false;
    let mut in_agent_lines = false;
    for line in txt.lines() {
        let l = line.split('#').next().unwrap_or_default().trim();
        if l.is_empty() { continue; }
        let Some((k, v)) = l.split_once(':') else { continue };
        let key = k.trim().to_lowercase();
        let val = v.trim();
        match key.as_str() {
            "user-agent" => {
                if !in_agent_lines { active = false; }
                active |= val == "*";
                in_agent_lines = true;
                continue;
            }
            "crawl-delay" if active => {
                // negative, NaN and out-of-range values count as no directive
                if let Some(delay) = val.parse::<f64>().ok().and_then(|s| Duration::try_from_secs_f64(s).ok()) {
                    robots.crawl_delay = Some(delay);
                }
            }
            "sitemap" => robots.sitemaps.push(val.to_string()),
            _ => {}
        }
        in_agent_lines = false;
    }
    robots
}
