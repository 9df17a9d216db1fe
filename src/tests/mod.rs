//! End-to-end pipeline tests over scripted collaborators.

mod pipeline;
