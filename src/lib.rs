//! # templater
//!
//! Inserts and cycles template tags (`<% %>`, `{{ }}`, `{% %}`, `<? ?>`) around
//! the selections of a text buffer.
//!
//! A [`Dialect`](templater::Dialect) compiles an opener, a closer and a table of
//! addon pairs into matchers and an ordered list of variants. A
//! [`TagCycler`](templater::TagCycler) uses it to find the tag around a
//! selection and either insert the first variant or advance to the next one.
//!
//! ```text
//! <% foo %>  ->  <%= foo %>  ->  <%# foo %>  ->  <%- foo -%>  -> ...
//! ```

pub mod templater;
