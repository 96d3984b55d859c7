/// Read-through caching for catalog responses.
///
/// Returns the cached value when present. Otherwise awaits `$block`, queues the result for a
/// background write with the given TTL (seconds), and returns it. Errors from the cache read
/// or from `$block` propagate with `?`, so the macro must be used inside a function
/// returning `AppResult`.
///
/// # Example
/// ```rust,ignore
/// let items: Vec<MediaItem> = cached!(self.cache, CacheKey::Popular(kind), 3600, async move {
///     self.fetch_popular(kind).await
/// })?;
/// ```
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $ttl:expr, $block:expr) => {{
        let key = $key;
        if let Some(cached) = $cache.get_from_cache(&key).await? {
            $crate::error::AppResult::Ok(cached)
        } else {
            let value = $block.await?;
            $cache.set_in_background(&key, &value, $ttl);
            $crate::error::AppResult::Ok(value)
        }
    }};
}
