pub mod distributions;
pub mod source;

#[cfg(test)]
mod test_sampling;
