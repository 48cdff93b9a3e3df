extern crate clap;
extern crate env_logger;
extern crate escapetime;
extern crate failure;
extern crate image;
extern crate num_cpus;

use clap::{App, Arg, ArgMatches};
use escapetime::{
    CancelToken, Limits, LogObserver, Palette, Precision, RenderOptions,
    ViewportRequest,
};
use image::png::PNGEncoder;
use image::ColorType;
use std::fs::File;
use std::io::{self, Write};
use std::str::FromStr;
use std::time::Duration;

fn parse_pair<T>(s: &str, separator: char) -> Option<(T, T)>
where
    T: FromStr,
{
    match s.find(separator) {
        None => None,
        Some(index) => match (T::from_str(&s[..index]), T::from_str(&s[index + 1..])) {
            (Ok(l), Ok(r)) => Some((l, r)),
            _ => None,
        },
    }
}

fn validate_pair<T: FromStr>(s: &str, separator: char, err: &str) -> Result<(), String> {
    match parse_pair::<T>(s, separator) {
        Some(_) => Ok(()),
        None => Err(err.to_string()),
    }
}

fn validate_range<T: FromStr + PartialOrd>(
    s: &str,
    low: T,
    high: T,
    isnotanumber_err: &str,
    isnotinrange_err: &str,
) -> Result<(), String> {
    match T::from_str(s) {
        Ok(i) => {
            if i >= low && i <= high {
                Ok(())
            } else {
                Err(isnotinrange_err.to_string())
            }
        }
        Err(_) => Err(isnotanumber_err.to_string()),
    }
}

fn validate_parse<T: FromStr<Err = String>>(s: &str) -> Result<(), String> {
    T::from_str(s).map(|_| ())
}

const OUTPUT: &str = "output";
const SIZE: &str = "size";
const TYPE: &str = "type";
const CENTER: &str = "center";
const ZOOM: &str = "zoom";
const PRECISION: &str = "precision";
const BITS: &str = "bits";
const ITERATIONS: &str = "iterations";
const SUPERSAMPLE: &str = "supersample";
const THREADS: &str = "threads";
const PALETTE: &str = "palette";
const JULIA: &str = "julia";
const TIMEOUT: &str = "timeout";

fn args<'a>() -> ArgMatches<'a> {
    let max_threads = num_cpus::get();

    App::new("fractal")
        .version("0.1.0")
        .about("Escape-time fractal renderer")
        .arg(
            Arg::with_name(OUTPUT)
                .required(true)
                .long(OUTPUT)
                .short("o")
                .takes_value(true)
                .help("Output PNG file, or - for stdout"),
        )
        .arg(
            Arg::with_name(SIZE)
                .long(SIZE)
                .short("s")
                .takes_value(true)
                .default_value("1024x1024")
                .validator(|s| validate_pair::<usize>(&s, 'x', "Could not parse output image size"))
                .help("Size of output image"),
        )
        .arg(
            Arg::with_name(TYPE)
                .long(TYPE)
                .short("t")
                .takes_value(true)
                .default_value("mandelbrot")
                .possible_values(&["mandelbrot", "julia", "tricorn", "newton"])
                .help("Fractal family"),
        )
        .arg(
            Arg::with_name(CENTER)
                .long(CENTER)
                .short("c")
                .takes_value(true)
                .allow_hyphen_values(true)
                .default_value("0,0")
                .validator(|s| validate_pair::<f64>(&s, ',', "Could not parse center point"))
                .help("Offset of the view, as re,im"),
        )
        .arg(
            Arg::with_name(ZOOM)
                .long(ZOOM)
                .short("z")
                .takes_value(true)
                .default_value("1.0")
                .validator(|s| {
                    validate_range(
                        &s,
                        std::f64::MIN_POSITIVE,
                        std::f64::MAX,
                        "Could not parse zoom",
                        "Zoom must be a positive number",
                    )
                })
                .help("Zoom factor; below 1 zooms in"),
        )
        .arg(
            Arg::with_name(PRECISION)
                .long(PRECISION)
                .short("p")
                .takes_value(true)
                .default_value("double")
                .validator(|s| validate_parse::<Precision>(&s))
                .help("Numeric tier: single, double, bigfloat or rational"),
        )
        .arg(
            Arg::with_name(BITS)
                .long(BITS)
                .short("b")
                .takes_value(true)
                .default_value("128")
                .validator(|s| {
                    validate_range(
                        &s,
                        16,
                        4096,
                        "Could not parse bit count",
                        "Bit count must be between 16 and 4096",
                    )
                })
                .help("Bits of precision for bigfloat and rational"),
        )
        .arg(
            Arg::with_name(ITERATIONS)
                .long(ITERATIONS)
                .short("i")
                .takes_value(true)
                .default_value("200")
                .validator(|s| {
                    validate_range(
                        &s,
                        1,
                        200_000,
                        "Could not parse iteration count",
                        "Iteration count must be between 1 and 200000",
                    )
                })
                .help("Maximum iterations per sample"),
        )
        .arg(
            Arg::with_name(SUPERSAMPLE)
                .long(SUPERSAMPLE)
                .short("a")
                .takes_value(true)
                .default_value("2")
                .validator(|s| {
                    validate_range(
                        &s,
                        1,
                        16,
                        "Could not parse supersampling factor",
                        "Supersampling factor must be between 1 and 16",
                    )
                })
                .help("Antialiasing: NxN samples per pixel"),
        )
        .arg(
            Arg::with_name(THREADS)
                .long(THREADS)
                .short("j")
                .takes_value(true)
                .default_value("0")
                .validator(move |s| {
                    validate_range(
                        &s,
                        0,
                        max_threads,
                        "Could not parse thread count",
                        &format!("Thread count must be between 0 and {}", max_threads),
                    )
                })
                .help("Number of threads to use in solver (0 for one per CPU)"),
        )
        .arg(
            Arg::with_name(PALETTE)
                .long(PALETTE)
                .takes_value(true)
                .default_value("smooth")
                .validator(|s| validate_parse::<Palette>(&s))
                .help("Gradient: smooth, logblue, bands or cosine"),
        )
        .arg(
            Arg::with_name(JULIA)
                .long(JULIA)
                .takes_value(true)
                .allow_hyphen_values(true)
                .validator(|s| validate_pair::<f64>(&s, ',', "Could not parse Julia constant"))
                .help("Julia constant, as re,im (default -0.7,0.27015)"),
        )
        .arg(
            Arg::with_name(TIMEOUT)
                .long(TIMEOUT)
                .takes_value(true)
                .validator(|s| {
                    validate_range(
                        &s,
                        1,
                        u64::max_value(),
                        "Could not parse timeout",
                        "Timeout must be at least 1ms",
                    )
                })
                .help("Give up after this many milliseconds"),
        )
        .get_matches()
}

fn value<T: FromStr>(matches: &ArgMatches, name: &str) -> Option<T> {
    matches.value_of(name).and_then(|s| T::from_str(s).ok())
}

fn write_image(outfile: &str, pixels: &[u8], bounds: (usize, usize)) -> Result<(), failure::Error> {
    if outfile == "-" {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        PNGEncoder::new(&mut handle).encode(
            pixels,
            bounds.0 as u32,
            bounds.1 as u32,
            ColorType::RGBA(8),
        )?;
        handle.flush()?;
    } else {
        let output = File::create(outfile)?;
        PNGEncoder::new(output).encode(pixels, bounds.0 as u32, bounds.1 as u32, ColorType::RGBA(8))?;
    }
    Ok(())
}

fn run(matches: &ArgMatches) -> Result<(), failure::Error> {
    let (width, height) = matches
        .value_of(SIZE)
        .and_then(|s| parse_pair::<usize>(s, 'x'))
        .unwrap_or((1024, 1024));
    let (center_x, center_y) = matches
        .value_of(CENTER)
        .and_then(|s| parse_pair::<f64>(s, ','))
        .unwrap_or((0.0, 0.0));
    let bits = value(matches, BITS).unwrap_or(escapetime::numeric::DEFAULT_PRECISION_BITS);
    let precision = value::<Precision>(matches, PRECISION)
        .unwrap_or_default()
        .with_bits(bits);

    let request = ViewportRequest {
        family: matches.value_of(TYPE).unwrap_or("mandelbrot").to_string(),
        center_x,
        center_y,
        zoom: value(matches, ZOOM).unwrap_or(1.0),
        width,
        height,
        precision,
        constant: matches.value_of(JULIA).and_then(|s| parse_pair::<f64>(s, ',')),
    };

    let threads = match value::<usize>(matches, THREADS) {
        Some(0) | None => num_cpus::get(),
        Some(n) => n,
    };
    let options = RenderOptions {
        limits: Limits {
            max_iterations: value(matches, ITERATIONS).unwrap_or(200),
            ..Limits::default()
        },
        supersample: value(matches, SUPERSAMPLE).unwrap_or(2),
        threads,
        palette: value::<Palette>(matches, PALETTE).unwrap_or_default(),
        ..RenderOptions::default()
    };

    let cancel = match value::<u64>(matches, TIMEOUT) {
        Some(ms) => CancelToken::with_timeout(Duration::from_millis(ms)),
        None => CancelToken::new(),
    };

    let observer = LogObserver;
    let renderer = request.renderer(options)?.with_observer(&observer);
    let image = renderer.render_with(&cancel)?;
    let bounds = (image.width(), image.height());
    write_image(
        matches.value_of(OUTPUT).unwrap_or("-"),
        &image.into_raw(),
        bounds,
    )
}

fn main() {
    env_logger::init();
    let matches = args();
    if let Err(e) = run(&matches) {
        eprintln!("Render failure: {}", e);
        std::process::exit(1);
    }
}
