use url::Url;

/// A video platform the backend knows how to transcribe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Platform {
    /// Human readable platform name
    pub name: &'static str,

    /// Domain matched against the URL host
    pub domain: &'static str,
}

/// Allow-list of supported platforms, checked in order
pub const SUPPORTED_PLATFORMS: &[Platform] = &[
    Platform { name: "YouTube", domain: "youtube.com" },
    Platform { name: "YouTube", domain: "youtu.be" },
    Platform { name: "Vimeo", domain: "vimeo.com" },
    Platform { name: "Dailymotion", domain: "dailymotion.com" },
    Platform { name: "Twitch", domain: "twitch.tv" },
    Platform { name: "Facebook", domain: "facebook.com" },
    Platform { name: "Instagram", domain: "instagram.com" },
    Platform { name: "TikTok", domain: "tiktok.com" },
];

/// Find the platform a URL belongs to.
///
/// Returns `None` for anything that does not parse as an absolute URL with a
/// host, so malformed input is simply not matched.
pub fn platform_for(url: &str) -> Option<&'static Platform> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?.to_lowercase();

    // `contains` also covers hosts ending with the domain (m.youtube.com, vm.tiktok.com)
    SUPPORTED_PLATFORMS
        .iter()
        .find(|platform| host.contains(platform.domain))
}

/// Check whether a URL may be submitted for extraction
pub fn accepts(url: &str) -> bool {
    platform_for(url).is_some()
}

/// List distinct platform names in allow-list order
pub fn list_platforms() -> Vec<&'static str> {
    let mut names: Vec<&'static str> = Vec::new();
    for platform in SUPPORTED_PLATFORMS {
        if !names.contains(&platform.name) {
            names.push(platform.name);
        }
    }
    names
}

/// Domains registered for a platform name
pub fn domains_for(name: &str) -> Vec<&'static str> {
    SUPPORTED_PLATFORMS
        .iter()
        .filter(|platform| platform.name == name)
        .map(|platform| platform.domain)
        .collect()
}
