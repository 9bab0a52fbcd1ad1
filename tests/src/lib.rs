mod measurement;
mod support;
