//! The `MetricSource` capability implemented by health-platform connectors.

use std::future::Future;

use chrono::{DateTime, Utc};

use crate::metric::NewMetric;

/// A read-only source of health samples.
///
/// Sources only produce [`NewMetric`] values; persisting them (and
/// validating them on the way in) is the store's job.
pub trait MetricSource: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Stable identifier, stored as the sample `source`.
  fn name(&self) -> &str;

  /// Samples for `user_id` with `since <= timestamp < until`.
  fn fetch<'a>(
    &'a self,
    user_id: &'a str,
    since: DateTime<Utc>,
    until: DateTime<Utc>,
  ) -> impl Future<Output = Result<Vec<NewMetric>, Self::Error>> + Send + 'a;
}
