/// A macro to route a remote call through a [`QueryClient`](crate::cache::QueryClient).
///
/// The block only runs when the key is neither cached nor already in flight.
/// Its result is cached on success and shared with every concurrent caller.
///
/// # Arguments
/// * `$client`: The `QueryClient` to resolve through.
/// * `$key`: The key identifying the request.
/// * `$cancel`: The caller's `CancellationToken`.
/// * `$block`: An `async move` block performing the actual call.
///
/// # Example
/// ```rust,ignore
/// let page = cached!(self.searches, CacheKey::search(text, page), cancel, async move {
///     provider.search(&text, page).await
/// })?;
/// ```
#[macro_export]
macro_rules! cached {
    ($client:expr, $key:expr, $cancel:expr, $block:expr) => {{
        $client.fetch($key, $cancel, move || $block).await
    }};
}
