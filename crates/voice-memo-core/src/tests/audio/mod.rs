mod capture;
mod resampler;
mod sampler;
