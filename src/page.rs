/// Build the viewer page. All album data is fetched by the page from the
/// `/api/*` endpoints; only the source label is baked in.
pub fn render_page(source_label: &str) -> String {
    format!(
        r##"<!DOCTYPE html>
<html lang="fr">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width,initial-scale=1">
<title>album-viewer</title>
<style>
*{{margin:0;padding:0;box-sizing:border-box}}
body{{background:#0a0a0a;color:#e0e0e0;font-family:-apple-system,BlinkMacSystemFont,"Segoe UI",Roboto,sans-serif;overflow-x:hidden}}
header{{position:sticky;top:0;z-index:100;background:rgba(10,10,10,.95);backdrop-filter:blur(12px);padding:1rem 2rem;display:flex;justify-content:space-between;align-items:center;border-bottom:1px solid #222}}
header h1{{font-size:1.2rem;font-weight:600;color:#4fc3f7}}
header .source{{font-size:.8rem;color:#666}}
#photoCount{{font-size:.9rem;color:#999}}
.filter-bar{{padding:.8rem 2rem;background:#111;border-bottom:1px solid #1a1a1a;display:flex;gap:1rem;align-items:center;flex-wrap:wrap}}
.filter-bar label{{font-size:.75rem;text-transform:uppercase;color:#666;letter-spacing:.05em;display:flex;gap:.4rem;align-items:center}}
.filter-bar input{{background:#1a1a1a;color:#ccc;border:1px solid #333;padding:.3rem .5rem;border-radius:6px}}
.filter-bar button,.folders button{{background:#1a1a1a;color:#ccc;border:1px solid #333;padding:.4rem .8rem;border-radius:6px;cursor:pointer;font-size:.85rem;transition:all .2s}}
.filter-bar button:hover,.folders button:hover,.folders button.active{{background:#4fc3f7;color:#000;border-color:#4fc3f7}}
#error{{color:#ef5350;padding:.5rem 2rem;display:none}}
main{{padding:1rem 2rem 4rem}}
.grid{{display:grid;grid-template-columns:repeat(auto-fill,minmax(180px,1fr));gap:10px}}
.card{{background:#141414;border:1px solid #222;border-radius:6px;cursor:pointer;transition:transform .2s;overflow:hidden}}
.card:hover{{transform:scale(1.03)}}
.card h3{{font-size:1rem;font-weight:500;padding:.8rem}}
.card .card-footer{{font-size:.75rem;color:#888;padding:0 .8rem .8rem}}

/* Album view */
.modal{{display:none;position:fixed;inset:0;z-index:1000;background:rgba(0,0,0,.97);overflow:auto;padding:2rem}}
.modal.open{{display:block}}
.modal-close{{position:absolute;top:1rem;right:1.5rem;font-size:2rem;color:#888;cursor:pointer}}
.modal-close:hover{{color:#fff}}
.modal h2{{color:#4fc3f7;font-weight:400}}
.modal .date{{color:#999;margin:.3rem 0 1rem}}
.descripcion-lista{{list-style:none;margin-bottom:1rem}}
.descripcion-lista li{{padding:.15rem 0}}
.folders{{display:flex;gap:.4rem;flex-wrap:wrap;margin-bottom:1rem}}
.viewer{{display:flex;align-items:center;justify-content:center;gap:1rem}}
.viewer img{{max-width:80vw;max-height:70vh;object-fit:contain;border-radius:4px}}
.nav{{font-size:3rem;color:#555;cursor:pointer;user-select:none;padding:1rem;display:none}}
.nav:hover{{color:#fff}}
.position{{text-align:center;color:#777;margin-top:.5rem}}
</style>
</head>
<body>
<header>
  <div>
    <h1>album-viewer</h1>
    <div class="source">{source}</div>
  </div>
  <span id="photoCount"></span>
</header>
<div class="filter-bar">
  <label>Date <input type="date" id="dateInput"></label>
  <label>De <input type="time" id="startTime"></label>
  <label>À <input type="time" id="endTime"></label>
  <label>Mot-clé <input type="text" id="keywordInput"></label>
  <label><input type="checkbox" id="includeWithoutDescription" checked> Sans description</label>
  <button id="searchBtn">Filtrer</button>
  <button id="resetFiltersBtn">Réinitialiser</button>
  <button id="reloadBtn">Recharger</button>
</div>
<div id="error"></div>
<main>
  <div class="grid" id="galleryContainer"></div>
</main>

<div class="modal" id="photoModal">
  <span class="modal-close" id="modalClose">&times;</span>
  <h2 id="modalTitle"></h2>
  <div class="date" id="modalDate"></div>
  <div id="modalDescription"></div>
  <div class="folders" id="folderButtons"></div>
  <div class="viewer">
    <span class="nav" id="prevBtn">&#8249;</span>
    <img id="modalImage" src="" alt="">
    <span class="nav" id="nextBtn">&#8250;</span>
  </div>
  <div class="position" id="modalPosition"></div>
</div>

<script>
const $=id=>document.getElementById(id);

function esc(s){{
  return String(s).replace(/&/g,'&amp;').replace(/</g,'&lt;').replace(/>/g,'&gt;').replace(/"/g,'&quot;');
}}

async function call(method,url,body){{
  const opts={{method}};
  if(body!==undefined){{opts.body=JSON.stringify(body);opts.headers={{'Content-Type':'application/json'}};}}
  const res=await fetch(url,opts);
  const data=await res.json();
  if(!res.ok)throw new Error(data.error||res.statusText);
  return data;
}}

function showError(msg){{
  const el=$('error');
  el.textContent=msg||'';
  el.style.display=msg?'block':'none';
}}

function renderGallery(view){{
  const container=$('galleryContainer');
  container.innerHTML='';
  view.albums.forEach(card=>{{
    const el=document.createElement('div');
    el.className='card';
    el.innerHTML='<h3>'+esc(card.label)+'</h3><div class="card-footer">'+esc(card.date)+'</div>';
    el.addEventListener('click',()=>openAlbum(card.id));
    container.appendChild(el);
  }});
  $('photoCount').textContent=view.count_label;
}}

function renderModal(view){{
  const modal=$('photoModal');
  if(!view){{modal.classList.remove('open');return;}}
  $('modalTitle').textContent=view.title;
  $('modalDate').textContent=view.date;
  $('modalDescription').innerHTML=view.description===null
    ?'Sans description'
    :'<ul class="descripcion-lista">'+view.description.map(l=>'<li><strong>'+esc(l.label)+':</strong> '+esc(l.value)+'</li>').join('')+'</ul>';
  const buttons=$('folderButtons');
  buttons.innerHTML='';
  view.folders.forEach(f=>{{
    const btn=document.createElement('button');
    btn.textContent=f.label;
    if(f.key===view.active_folder)btn.classList.add('active');
    btn.addEventListener('click',()=>act('POST','/api/folder?key='+encodeURIComponent(f.key)));
    buttons.appendChild(btn);
  }});
  $('modalImage').src=view.image||'';
  $('modalImage').style.display=view.image?'':'none';
  const nav=view.show_navigation?'inline-block':'none';
  $('prevBtn').style.display=nav;
  $('nextBtn').style.display=nav;
  $('modalPosition').textContent=view.total?view.position+' / '+view.total:'';
  modal.classList.add('open');
}}

async function act(method,url,body){{
  try{{renderModal(await call(method,url,body));}}catch(e){{showError(e.message);}}
}}

async function gallery(method,url,body){{
  try{{renderGallery(await call(method,url,body));showError('');}}catch(e){{showError(e.message);}}
}}

function openAlbum(id){{act('POST','/api/open?id='+encodeURIComponent(id));}}

function closeAlbum(){{
  call('POST','/api/close').catch(e=>showError(e.message));
  renderModal(null);
}}

$('searchBtn').addEventListener('click',()=>gallery('POST','/api/filters',{{
  date:$('dateInput').value,
  start_time:$('startTime').value,
  end_time:$('endTime').value,
  keyword:$('keywordInput').value.toLowerCase(),
  include_without_description:$('includeWithoutDescription').checked
}}));

$('resetFiltersBtn').addEventListener('click',()=>{{
  $('dateInput').value='';
  $('startTime').value='';
  $('endTime').value='';
  $('keywordInput').value='';
  $('includeWithoutDescription').checked=true;
  gallery('POST','/api/filters/reset');
}});

$('reloadBtn').addEventListener('click',()=>{{
  gallery('POST','/api/reload').then(()=>call('GET','/api/filters')).then(fillFilters).catch(()=>{{}});
}});
$('prevBtn').addEventListener('click',()=>act('POST','/api/prev'));
$('nextBtn').addEventListener('click',()=>act('POST','/api/next'));
$('modalClose').addEventListener('click',closeAlbum);

document.addEventListener('keydown',e=>{{
  if(!$('photoModal').classList.contains('open'))return;
  if(e.key==='Escape')closeAlbum();
  if(e.key==='ArrowLeft')act('POST','/api/prev');
  if(e.key==='ArrowRight')act('POST','/api/next');
}});

function fillFilters(c){{
  $('dateInput').value=c.date;
  $('startTime').value=c.start_time;
  $('endTime').value=c.end_time;
  $('keywordInput').value=c.keyword;
  $('includeWithoutDescription').checked=c.include_without_description;
}}

// Init
call('GET','/api/filters').then(fillFilters).catch(()=>{{}});
gallery('GET','/api/albums');
call('GET','/api/modal').then(renderModal).catch(()=>{{}});
</script>
</body>
</html>"##,
        source = escape_html(source_label),
    )
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
