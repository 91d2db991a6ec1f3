// Script showcase library deriving bitcoin output scripts and addresses
// by LNP/BP Association (https://lnp-bp.org)
// Written in 2020-2022 by
//     Dr. Maxim Orlovsky <orlovsky@lnp-bp.org>
//
// To the extent possible under law, the author(s) have dedicated all
// copyright and related and neighboring rights to this software to
// the public domain worldwide. This software is distributed without
// any warranty.
//
// You should have received a copy of the Apache-2.0 License
// along with this software.
// If not, see <https://opensource.org/licenses/Apache-2.0>.

#[macro_use]
extern crate clap;
#[macro_use]
extern crate amplify;

use std::path::PathBuf;
use std::{fs, io};

use amplify::IoError;
use clap::Parser;
use colored::Colorize;
use showcase::templates::{AddressNetwork, AddressParams};
use showcase::{Section, ShowcaseRequest};

/// Command-line arguments
#[derive(Parser)]
#[derive(Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug)]
#[clap(
    author,
    version,
    name = "tapscript-showcase",
    about = "Command-line showcase of bitcoin output scripts, taproot trees and addresses"
)]
pub struct Args {
    /// Network to encode addresses for: `mainnet`, `testnet` or `regtest`.
    #[clap(short, long, default_value = "mainnet")]
    pub network: AddressNetwork,

    /// YAML file with the list of keys and sections to render. If absent,
    /// the built-in demo over secret keys 1, 2 and 3 is used.
    #[clap(short, long)]
    pub request: Option<PathBuf>,

    /// Output format.
    #[clap(short, long, value_enum, default_value = "text")]
    pub format: Format,

    /// Replace private keys of the request with keys generated from the
    /// operating system random number generator.
    #[clap(long)]
    pub random_keys: bool,

    /// Print YAML of the built-in demo request and exit. Can be used as a
    /// template for custom requests.
    #[clap(long)]
    pub dump_demo: bool,
}

/// Output format
#[derive(ValueEnum)]
#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug)]
pub enum Format {
    /// Human-readable text
    Text,

    /// YAML list of sections
    Yaml,
}

impl Args {
    fn load_request(&self) -> Result<ShowcaseRequest, Error> {
        let mut request = match &self.request {
            Some(path) => {
                log::info!("Reading showcase request from {}", path.display());
                let yaml = fs::read_to_string(path)?;
                serde_yaml::from_str(&yaml)?
            }
            None => {
                log::info!("Using built-in demo request");
                ShowcaseRequest::demo()
            }
        };
        if self.random_keys {
            log::info!("Generating {} random private key(s)", request.keys.len());
            request.randomize_keys();
        }
        Ok(request)
    }

    pub fn exec(self) -> Result<(), Error> {
        if self.dump_demo {
            let mut request = ShowcaseRequest::demo();
            if self.random_keys {
                request.randomize_keys();
            }
            print!("{}", serde_yaml::to_string(&request)?);
            return Ok(());
        }

        let request = self.load_request()?;
        let params = AddressParams::from(self.network);
        log::info!(
            "Rendering {} section(s) over {} key(s) for {}",
            request.sections.len(),
            request.keys.len(),
            self.network
        );
        let sections = request.render(&params)?;
        for section in &sections {
            log::debug!("Built {} output {}", section.category, section.address);
        }

        match self.format {
            Format::Yaml => print!("{}", serde_yaml::to_string(&sections)?),
            Format::Text => {
                for section in &sections {
                    print_section(section);
                }
            }
        }
        Ok(())
    }
}

fn print_section(section: &Section) {
    let text = section.to_string();
    let (title, details) = text.split_once('\n').unwrap_or((&text, ""));
    println!("{}", title.bright_white().underline());
    println!("{}", details);
}

#[derive(Debug, Display, Error, From)]
#[display(inner)]
pub enum Error {
    #[from(io::Error)]
    Io(IoError),

    #[from]
    Yaml(serde_yaml::Error),

    #[from]
    Showcase(showcase::Error),
}

fn main() {
    env_logger::init();

    let args = Args::parse();
    if let Err(err) = args.exec() {
        eprintln!("{}: {}\n", "Error".bright_red(), err);
    }
}
