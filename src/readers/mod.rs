//! This module declares all readers.
//! A reader is used to fetch data over the network. The HTTP reader
//! retrieves advisory pages, the HTML helpers turn them into something
//! a vendor parser can search.

pub mod html;
pub mod http;
