//! Integration tests across discovery, session, cache and gateway.

#[cfg(test)]
mod support;

#[cfg(test)]
mod flows;
#[cfg(test)]
mod scenarios;
