use anyhow::{bail, Context, Result};
use apm_artifact::{AppName, SemanticVersion};
use apm_introspect::SolidityIntrospector;
use apm_publish::config::{AppManifest, DEFAULT_IPFS_API_URL, DEFAULT_IPFS_GATEWAY};
use apm_publish::content_uri;
use apm_publish::deploy::abi_from_json;
use apm_publish::{
    ArtifactBuilder, ArtifactValidator, ContentAddressStore, ContentUri, HttpFetcher,
    IgnorePatterns, IpfsHttpClient, VersionResolver,
};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn cli() -> Command {
    Command::new("apm-publish")
        .version(apm_publish::VERSION)
        .about("APM release tooling: versions, artifacts, content URIs, uploads")
        .subcommand_required(true)
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON"),
        )
        .subcommand(
            Command::new("next-version")
                .about("Resolve the next version from a bump or explicit version")
                .arg(Arg::new("bump").required(true).help("major, minor, patch or x.y.z"))
                .arg(
                    Arg::new("previous")
                        .long("previous")
                        .value_parser(value_parser!(SemanticVersion))
                        .help("Latest published version"),
                ),
        )
        .subcommand(
            Command::new("content-uri")
                .about("Encode, decode and resolve content URIs")
                .subcommand_required(true)
                .subcommand(
                    Command::new("encode")
                        .arg(Arg::new("protocol").required(true))
                        .arg(Arg::new("location").required(true))
                        .arg(
                            Arg::new("hex")
                                .long("hex")
                                .action(ArgAction::SetTrue)
                                .help("Print the on-chain hex form"),
                        ),
                )
                .subcommand(
                    Command::new("decode")
                        .arg(Arg::new("uri").required(true).help("protocol:location or 0x hex")),
                )
                .subcommand(
                    Command::new("url").arg(Arg::new("uri").required(true)).arg(
                        Arg::new("gateway")
                            .long("gateway")
                            .default_value(DEFAULT_IPFS_GATEWAY),
                    ),
                ),
        )
        .subcommand(
            Command::new("artifact")
                .about("Generate artifact.json")
                .arg(Arg::new("app-name").long("app-name").required(true))
                .arg(Arg::new("contract").long("contract").required(true))
                .arg(
                    Arg::new("abi")
                        .long("abi")
                        .required(true)
                        .value_parser(value_parser!(PathBuf)),
                )
                .arg(
                    Arg::new("flat-code")
                        .long("flat-code")
                        .required(true)
                        .value_parser(value_parser!(PathBuf)),
                )
                .arg(
                    Arg::new("arapp")
                        .long("arapp")
                        .value_parser(value_parser!(PathBuf))
                        .help("Project directory holding arapp.json (roles, dependencies)"),
                )
                .arg(
                    Arg::new("out")
                        .long("out")
                        .value_parser(value_parser!(PathBuf))
                        .help("Write to this file instead of stdout"),
                ),
        )
        .subcommand(
            Command::new("validate")
                .about("Validate a release directory")
                .arg(
                    Arg::new("dist")
                        .required(true)
                        .value_parser(value_parser!(PathBuf)),
                )
                .arg(Arg::new("contract").long("contract").required(true))
                .arg(
                    Arg::new("no-frontend")
                        .long("no-frontend")
                        .action(ArgAction::SetTrue)
                        .help("Skip icon and screenshot checks"),
                ),
        )
        .subcommand(
            Command::new("upload")
                .about("Upload a release directory to an IPFS node")
                .arg(
                    Arg::new("dir")
                        .required(true)
                        .value_parser(value_parser!(PathBuf)),
                )
                .arg(
                    Arg::new("ipfs-url")
                        .long("ipfs-url")
                        .default_value(DEFAULT_IPFS_API_URL),
                )
                .arg(
                    Arg::new("ignore-dir")
                        .long("ignore-dir")
                        .value_parser(value_parser!(PathBuf))
                        .help("Directory holding .ipfsignore/.gitignore (default: the release)"),
                ),
        )
        .subcommand(
            Command::new("resolve")
                .about("Fetch a published release through a gateway")
                .arg(Arg::new("uri").required(true))
                .arg(
                    Arg::new("gateway")
                        .long("gateway")
                        .default_value(DEFAULT_IPFS_GATEWAY),
                ),
        )
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn required<'a>(args: &'a ArgMatches, name: &str) -> Result<&'a String> {
    args.get_one::<String>(name)
        .with_context(|| format!("missing --{name}"))
}

fn required_path<'a>(args: &'a ArgMatches, name: &str) -> Result<&'a PathBuf> {
    args.get_one::<PathBuf>(name)
        .with_context(|| format!("missing --{name}"))
}

fn parse_uri(text: &str) -> Result<ContentUri> {
    let uri = if text.starts_with("0x") {
        ContentUri::from_hex(text)?
    } else {
        content_uri::decode(text)?
    };
    Ok(uri)
}

fn next_version(args: &ArgMatches) -> Result<()> {
    let previous = args.get_one::<SemanticVersion>("previous").copied();
    let resolution = VersionResolver.resolve(required(args, "bump")?, previous)?;
    println!("{}", resolution.next_version);
    println!("bump: {}", resolution.bump);
    println!(
        "new contract required: {}",
        if resolution.requires_deployment(previous) { "yes" } else { "no" }
    );
    Ok(())
}

fn content_uri_command(args: &ArgMatches) -> Result<()> {
    match args.subcommand() {
        Some(("encode", args)) => {
            let text = content_uri::encode(required(args, "protocol")?, required(args, "location")?)?;
            if args.get_flag("hex") {
                println!("{}", parse_uri(&text)?.to_hex());
            } else {
                println!("{text}");
            }
        }
        Some(("decode", args)) => {
            let uri = parse_uri(required(args, "uri")?)?;
            println!("protocol: {}", uri.protocol());
            println!("location: {}", uri.location());
        }
        Some(("url", args)) => {
            let uri = parse_uri(required(args, "uri")?)?;
            let gateway = args.get_one::<String>("gateway").map(String::as_str);
            println!("{}", uri.fetch_url(gateway)?);
        }
        _ => bail!("unknown content-uri command"),
    }
    Ok(())
}

fn artifact(args: &ArgMatches) -> Result<()> {
    let app = AppName::parse(required(args, "app-name")?)?;
    let contract = required(args, "contract")?;
    let abi_path = required_path(args, "abi")?;
    let code_path = required_path(args, "flat-code")?;

    let abi_text = std::fs::read_to_string(abi_path)
        .with_context(|| format!("cannot read {}", abi_path.display()))?;
    let abi = abi_from_json(abi_path, &abi_text)?;
    let flat_code = std::fs::read_to_string(code_path)
        .with_context(|| format!("cannot read {}", code_path.display()))?;
    let arapp = match args.get_one::<PathBuf>("arapp") {
        Some(dir) => AppManifest::load(dir)?,
        None => AppManifest::default(),
    };

    let artifact = ArtifactBuilder::new(Arc::new(SolidityIntrospector::default())).build(
        &app,
        contract,
        &arapp.roles,
        &arapp.dependencies,
        &abi,
        &flat_code,
    )?;
    let json = artifact.to_canonical_json()?;

    match args.get_one::<PathBuf>("out") {
        Some(out) => {
            std::fs::write(out, json).with_context(|| format!("cannot write {}", out.display()))?;
            tracing::info!(path = %out.display(), functions = artifact.functions.len(), "wrote artifact");
        }
        None => print!("{}", String::from_utf8_lossy(&json)),
    }
    Ok(())
}

fn validate(args: &ArgMatches) -> Result<bool> {
    let dist = required_path(args, "dist")?;
    let contract = required(args, "contract")?;
    let validator = ArtifactValidator::new(Arc::new(SolidityIntrospector::default()));
    let report = validator.validate(dist, contract, !args.get_flag("no-frontend"))?;
    if report.is_empty() {
        println!("{} is valid", dist.display());
        Ok(true)
    } else {
        println!("{} has {} problem(s):\n{report}", dist.display(), report.findings().len());
        Ok(false)
    }
}

async fn upload(args: &ArgMatches) -> Result<()> {
    let dir = required_path(args, "dir")?;
    let ignore_dir = args.get_one::<PathBuf>("ignore-dir").unwrap_or(dir);
    let ignore = IgnorePatterns::from_dir(ignore_dir)?;

    let client = IpfsHttpClient::connect(args.get_one::<String>("ipfs-url").map(String::as_str)).await?;
    let store = ContentAddressStore::new(Arc::new(client), Arc::new(HttpFetcher::new()));
    let hash = store.upload(dir, &ignore).await?;
    println!("{hash}");
    println!("{}", ContentUri::ipfs(hash)?);
    Ok(())
}

async fn resolve(args: &ArgMatches) -> Result<()> {
    let uri = parse_uri(required(args, "uri")?)?;
    let gateway = args.get_one::<String>("gateway").map(String::as_str);
    let store = ContentAddressStore::new(
        Arc::new(IpfsHttpClient::new(Some(DEFAULT_IPFS_API_URL))?),
        Arc::new(HttpFetcher::new()),
    );
    let content = store.resolve(&uri, gateway).await?;
    println!("app: {}", content.artifact.app_name);
    println!("app id: {}", content.artifact.app_id);
    if let Some(name) = &content.manifest.name {
        println!("name: {name}");
    }
    println!("roles: {}", content.artifact.roles.len());
    for function in &content.artifact.functions {
        println!("  {} {:?}", function.sig, function.roles);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();
    init_tracing(matches.get_flag("log-json"));

    match matches.subcommand() {
        Some(("next-version", args)) => next_version(args)?,
        Some(("content-uri", args)) => content_uri_command(args)?,
        Some(("artifact", args)) => artifact(args)?,
        Some(("validate", args)) => {
            if !validate(args)? {
                std::process::exit(1);
            }
        }
        Some(("upload", args)) => upload(args).await?,
        Some(("resolve", args)) => resolve(args).await?,
        _ => bail!("unknown command"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_is_well_formed() {
        cli().debug_assert();
    }

    #[test]
    fn parses_next_version() {
        let matches = cli()
            .try_get_matches_from(["apm-publish", "next-version", "minor", "--previous", "1.2.3"])
            .unwrap();
        let (name, args) = matches.subcommand().unwrap();
        assert_eq!(name, "next-version");
        assert_eq!(
            args.get_one::<SemanticVersion>("previous").copied(),
            Some(SemanticVersion::new(1, 2, 3))
        );
    }

    #[test]
    fn upload_defaults_to_local_node() {
        let matches = cli()
            .try_get_matches_from(["apm-publish", "upload", "dist"])
            .unwrap();
        let (_, args) = matches.subcommand().unwrap();
        assert_eq!(
            args.get_one::<String>("ipfs-url").map(String::as_str),
            Some(DEFAULT_IPFS_API_URL)
        );
        assert_eq!(args.get_one::<PathBuf>("ignore-dir"), None);
    }

    #[test]
    fn hex_uris_are_accepted() {
        assert_eq!(parse_uri("0x697066733a516d").unwrap(), ContentUri::ipfs("Qm").unwrap());
        assert_eq!(parse_uri("ipfs:Qm").unwrap(), ContentUri::ipfs("Qm").unwrap());
    }
}
