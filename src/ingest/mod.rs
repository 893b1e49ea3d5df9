/// Upstream air-quality providers.
///
/// Each provider gets its own file with URL construction, fetch and
/// envelope parsing. Record field mapping lives in `schema` so it is shared
/// by every provider.
pub mod ogd;
pub mod schema;

#[cfg(test)]
pub(crate) mod fixtures;
